pub const SUCCESS: i32 = 0;
/// Synthesis, analysis or output failed
pub const EXECUTION_ERROR: i32 = 1;
/// Bad arguments or unreadable input
pub const INPUT_ERROR: i32 = 2;
/// Batch run where some files failed
pub const PARTIAL_FAILURE: i32 = 3;
