//! Demonstration binary: wires a liquidity provider and a momentum trader
//! against a live kernel, bus, and exchange agent, and prints the resulting
//! trace of orders, trades, and market data for one symbol.
//!
//! Not a product surface — no CLI flags, no config file. It exists to show
//! that the core crates expose enough surface for the kind of strategy code
//! built on top of them.

mod agents;

use agents::{LiquidityProviderAgent, MomentumTraderAgent};
use exchange_agent::{ExchangeAgent, ExchangeAgentConfig};
use sim_core::{Agent, AgentContext, Kernel, Message};
use std::cell::RefCell;
use std::rc::Rc;

const SYMBOL: &str = "AAPL";
const RUN_DURATION_MS: i64 = 10_000;

/// Subscribes to every topic for `SYMBOL` and prints each delivery as it
/// arrives, giving the run a visible, timestamp-ordered trace.
struct TraceLogger {
    agent_id: String,
    symbol: String,
}

impl Agent for TraceLogger {
    fn agent_id(&self) -> &str {
        &self.agent_id
    }

    fn bind(&mut self, ctx: AgentContext) {
        ctx.subscribe(format!("{}.*", self.symbol));
    }

    fn receive_message(&mut self, message: &Message) {
        println!("[{:>6}ms] {:<24} {}", message.timestamp, message.topic, message.payload);
    }
}

fn init_tracing() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn main() {
    init_tracing();
    tracing::info!(symbol = SYMBOL, duration_ms = RUN_DURATION_MS, "starting demonstration run");

    let mut kernel = Kernel::new();

    let exchange = Rc::new(RefCell::new(ExchangeAgent::new("EXCHANGE", ExchangeAgentConfig::default())));
    kernel.register_agent(exchange.clone());
    exchange.borrow_mut().initialize_symbol(SYMBOL);

    let logger = Rc::new(RefCell::new(TraceLogger {
        agent_id: "TRACE".to_string(),
        symbol: SYMBOL.to_string(),
    }));
    kernel.register_agent(logger);

    let liquidity_provider = Rc::new(RefCell::new(LiquidityProviderAgent::new("LP1", SYMBOL)));
    kernel.register_agent(liquidity_provider);

    let momentum_trader = Rc::new(RefCell::new(MomentumTraderAgent::new("MOM1", SYMBOL)));
    kernel.register_agent(momentum_trader);

    kernel.run(RUN_DURATION_MS);

    tracing::info!("demonstration run complete");
}
