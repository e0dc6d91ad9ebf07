pub mod clock;
pub mod dir;
pub mod hours;
pub mod logging;
pub mod time;
