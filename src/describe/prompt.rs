//! Instruction text for the two description modes.

/// Instruction for a frame with no prior context.
pub const COLD_START_INSTRUCTION: &str = "Describe the image. Keep it brief. \
Don't start with 'The image shows'. Just give the description.";

/// Instruction for a frame that follows an already narrated one.
///
/// The first attached image is the previous frame, the second the current one.
/// `preview` is the narration so far; the model is asked to report only what
/// is new and to keep the comparison itself out of the answer.
pub fn continuation_instruction(preview: &str) -> String {
    format!(
        "The images are two consecutive frames of a continuous live video. \
The first image is the previous frame and the second image is the current frame. \
The narration so far is: \"{preview}\". \
Compare the two frames and the narration, then describe only what is new in the current frame. \
Do not repeat anything already present in the previous frame or in the narration. \
Connect the current description to the narration, since both frames come from the same live feed. \
Do not mention the comparison in your answer and do not start with 'In this frame'. \
Keep it brief."
    )
}
