pub mod capture_gate;
pub mod face_counter;
pub mod flow_config;
pub mod flow_coordinator;
pub mod flow_error;
pub mod flow_state;
pub mod flow_view;
pub mod selfie_validation_screen;
#[cfg(test)]
mod test_support;
pub mod ui_executor;
