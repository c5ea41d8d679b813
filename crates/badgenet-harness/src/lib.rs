//! Deterministic simulation harness for BadgeNet.
//!
//! Runs whole badges - stack, pumps, runtime, apps - against a shared
//! in-memory radio ether on tokio's paused clock, with a seeded RNG for
//! reproducible backoff. Tests build a topology from [`Ether`] and
//! [`SimNode`], script carrier-sense results and keyboard input, and
//! assert on the ether's transmission log.

pub mod peripherals;
pub mod sim_env;
pub mod sim_node;
pub mod sim_radio;

pub use peripherals::{RecordingDisplay, ScriptedKeyboard, StubSigner, StubVerifier};
pub use sim_env::SimEnv;
pub use sim_node::SimNode;
pub use sim_radio::{Ether, SimRadio, Transmission};
