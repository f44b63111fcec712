use roi_rs::RoiError;

pub const SUCCESS: i32 = 0;
pub const EXECUTION_ERROR: i32 = 1;
pub const INPUT_ERROR: i32 = 2;
pub const TOOL_NOT_FOUND: i32 = 3;
/// Batch finished with some inputs failed
pub const PARTIAL_FAILURE: i32 = 4;

pub fn for_error(err: &RoiError) -> i32 {
    match err {
        RoiError::FileNotFound(_) | RoiError::InvalidParameter(_) => INPUT_ERROR,
        RoiError::ToolNotFound(_) => TOOL_NOT_FOUND,
        _ => EXECUTION_ERROR,
    }
}
