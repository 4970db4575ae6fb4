/// Where a request currently is in the proxy pipeline.
///
/// The last stage reached is what the access log reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Stage {
    #[default]
    ReceiveRequest,
    Preflight,
    Landing,
    ResolveTarget,
    TransformRequestHeaders,
    Dispatch,
    TransformResponseHeaders,
    EmitRedirect,
    EmitResponse,
    Fail400,
    Fail502,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::ReceiveRequest => "receive_request",
            Stage::Preflight => "preflight",
            Stage::Landing => "landing",
            Stage::ResolveTarget => "resolve_target",
            Stage::TransformRequestHeaders => "transform_request_headers",
            Stage::Dispatch => "dispatch",
            Stage::TransformResponseHeaders => "transform_response_headers",
            Stage::EmitRedirect => "emit_redirect",
            Stage::EmitResponse => "emit_response",
            Stage::Fail400 => "fail_400",
            Stage::Fail502 => "fail_502",
        }
    }

    /// Terminal stages answer the client without (further) upstream traffic.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Stage::Preflight
                | Stage::Landing
                | Stage::EmitRedirect
                | Stage::EmitResponse
                | Stage::Fail400
                | Stage::Fail502
        )
    }
}
