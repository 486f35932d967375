// pushgate-test-utils
//
// Shared test infrastructure:
// - `run_adapter_conformance` exercises any `Adapter` implementation
// - `ScriptedPushProvider` records calls, fails chosen tokens and can park sends
// - account fixtures for seeding stores directly

pub mod adapter_suite;
pub mod fixtures;
pub mod push;

pub use adapter_suite::run_adapter_conformance;
pub use fixtures::{account_fixture, insert_account};
pub use push::{RecordedCall, ScriptedPushProvider, SendGate};
