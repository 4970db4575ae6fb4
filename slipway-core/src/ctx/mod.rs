mod request_ctx;
mod request_id;
mod response_route;
mod stage;

#[cfg(test)]
mod tests;

pub use request_ctx::RequestCtx;
pub use request_id::RequestId;
pub use response_route::ResponseRoute;
pub use stage::Stage;
