pub mod classifier;
pub mod dispatcher;
#[cfg(feature = "onnx")]
pub mod onnx_classifier;
