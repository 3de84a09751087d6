//! GPIO |     Function    |      Notes
//! -----+-----------------+----------------------------------
//!  4   | Button A        | To 3V3 when pressed, internal pulldown
//!  5   | Button B        | To 3V3 when pressed, internal pulldown
//!  7   | Status LED      | Active HIGH
//!
//! ESP32-C3-DevKitM-1 layout; GPIO2/8/9 are strapping pins and stay free.

// ----- Buttons -----
pub const BTN_A: u8 = 4;
pub const BTN_B: u8 = 5;

// ----- LED -----
pub const LED: u8 = 7;
