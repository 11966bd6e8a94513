/// Cloud transcriber for OpenAI-compatible chat-completions APIs.
pub mod openai;

/// Document classifier running a DiT/RVL-CDIP export on ONNX Runtime.
#[cfg(feature = "onnx")]
pub mod dit;

/// Handwriting line recognizer running a CTC export on ONNX Runtime.
#[cfg(feature = "onnx")]
pub mod ctc;

#[cfg(feature = "onnx")]
mod onnx;
