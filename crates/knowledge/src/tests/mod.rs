//! Engine scenarios and the test doubles they share.


mod engine;
