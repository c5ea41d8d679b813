//! One whole simulated badge.

use std::sync::Arc;

use badgenet_app::{Peripherals, Runtime};
use badgenet_core::{MemoryConfig, NetConfig, NetHandle, NetStack, Radio};

use crate::{
    peripherals::{RecordingDisplay, ScriptedKeyboard, StubSigner, StubVerifier},
    sim_env::SimEnv,
    sim_radio::{Ether, SimRadio},
};

/// A badge in the simulation: stack, pumps, runtime, and scripted
/// peripherals, attached to a shared [`Ether`].
///
/// The network pumps start immediately; apps are spawned by the test
/// through [`SimNode::runtime`].
pub struct SimNode {
    /// Node address.
    pub address: u32,
    /// The runtime (spawn apps here).
    pub runtime: Runtime<SimEnv>,
    /// Handle into the node's network stack.
    pub net: NetHandle,
    /// The node's radio, for scripting faults and carrier sense.
    pub radio: Arc<SimRadio>,
    /// Recording display double.
    pub display: Arc<RecordingDisplay>,
    /// Scripted keyboard double.
    pub keyboard: Arc<ScriptedKeyboard>,
    /// In-memory config store.
    pub config: Arc<MemoryConfig>,
}

impl SimNode {
    /// Join the ether with a default-configured stack.
    #[must_use]
    pub fn join(ether: &Ether, address: u32, env: &SimEnv) -> Self {
        Self::join_with(ether, address, env, NetConfig::default(), false)
    }

    /// Join the ether as an organizer badge (carries the signing key).
    #[must_use]
    pub fn join_signer(ether: &Ether, address: u32, env: &SimEnv) -> Self {
        Self::join_with(ether, address, env, NetConfig::default(), true)
    }

    /// Join the ether with explicit stack tuning.
    #[must_use]
    pub fn join_with(
        ether: &Ether,
        address: u32,
        env: &SimEnv,
        net_config: NetConfig,
        with_signer: bool,
    ) -> Self {
        let stack = NetStack::new(address, net_config, env.clone());
        let net = stack.handle();

        let radio = Arc::new(ether.radio());
        let display = Arc::new(RecordingDisplay::new());
        let keyboard = Arc::new(ScriptedKeyboard::new());
        let config = Arc::new(MemoryConfig::new());

        let peripherals = Peripherals {
            config: Arc::clone(&config) as _,
            display: Arc::clone(&display) as _,
            keyboard: Arc::clone(&keyboard) as _,
            verifier: Arc::new(StubVerifier),
            signer: with_signer.then(|| Arc::new(StubSigner) as _),
        };

        let mut runtime = Runtime::new(env.clone(), stack, peripherals);
        runtime.start_network(Arc::clone(&radio) as Arc<dyn Radio>);

        Self { address, runtime, net, radio, display, keyboard, config }
    }
}
