mod calibration;

pub use test_runner::run;
