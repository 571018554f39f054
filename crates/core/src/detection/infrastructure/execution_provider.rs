use ort::execution_providers::ExecutionProviderDispatch;

/// Hardware-accelerated ONNX execution providers for the detector session.
///
/// An empty list (or a provider that fails to register) leaves ONNX Runtime
/// on its CPU provider, which BlazeFace runs comfortably at camera rate.
pub fn preferred_execution_providers() -> Vec<ExecutionProviderDispatch> {
    #[cfg(target_os = "macos")]
    {
        log::debug!("Detector execution provider: CoreML");
        vec![ort::execution_providers::CoreMLExecutionProvider::default().build()]
    }
    #[cfg(target_os = "windows")]
    {
        log::debug!("Detector execution provider: DirectML");
        vec![ort::execution_providers::DirectMLExecutionProvider::default().build()]
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        log::debug!("Detector execution provider: CPU");
        vec![]
    }
}
