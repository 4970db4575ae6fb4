mod error_classification;
mod gateway;
mod gateway_ctx;
mod handlers;
mod pipeline;

#[cfg(test)]
mod tests;

pub use gateway::SlipwayGateway;
