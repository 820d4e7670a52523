/// Tunables for an `ExchangeAgent`. Defaults match the original's.
#[derive(Clone, Copy, Debug)]
pub struct ExchangeAgentConfig {
    pub market_data_update_interval: i64,
    pub default_min_fill_percent: f64,
}

impl Default for ExchangeAgentConfig {
    fn default() -> Self {
        ExchangeAgentConfig {
            market_data_update_interval: 100,
            default_min_fill_percent: 0.8,
        }
    }
}
