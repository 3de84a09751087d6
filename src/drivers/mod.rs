// Input drivers, board-independent.
//
// Pins come from a PinBank; which GPIOs back it is decided in board/.

pub mod edge;
pub mod input;
