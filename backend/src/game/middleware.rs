//! Step chains: connection setup before a socket is registered, and
//! per-frame processing before a frame is routed.

use crate::game::core::{MatchInfo, UserId};
use crate::game::error::SessionError;
use crate::game::manager::GameManager;
use crate::game::registry::PlayerRegistry;
use crate::game::session::ConnectionPhase;
use crate::metrics::Metrics;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const RATE_WINDOW: Duration = Duration::from_secs(1);

/// Identity of the connection a frame arrived on
pub struct FrameContext<'a> {
    pub match_id: &'a str,
    pub user_id: &'a str,
}

/// Mutable per-connection state the steps may keep between frames
pub struct StepState {
    window_start: Instant,
    frames_in_window: u32,
}

impl StepState {
    pub fn new() -> Self {
        Self {
            window_start: Instant::now(),
            frames_in_window: 0,
        }
    }
}

impl Default for StepState {
    fn default() -> Self {
        Self::new()
    }
}

pub trait InboundStep: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    fn process(&self, ctx: &FrameContext<'_>, state: &mut StepState) -> Result<(), SessionError>;
}

/// Marks the connection as active and counts the frame
pub struct RecordActivity {
    players: Arc<PlayerRegistry>,
    metrics: Arc<Metrics>,
}

impl RecordActivity {
    pub fn new(players: Arc<PlayerRegistry>, metrics: Arc<Metrics>) -> Self {
        Self { players, metrics }
    }
}

impl InboundStep for RecordActivity {
    fn name(&self) -> &'static str {
        "record_activity"
    }

    fn process(&self, ctx: &FrameContext<'_>, _state: &mut StepState) -> Result<(), SessionError> {
        self.players.touch(ctx.match_id, ctx.user_id);
        self.metrics.frame_received();
        Ok(())
    }
}

/// Fixed one-second window per connection
pub struct RateLimit {
    per_second: u32,
}

impl RateLimit {
    pub fn new(per_second: u32) -> Self {
        Self { per_second }
    }
}

impl InboundStep for RateLimit {
    fn name(&self) -> &'static str {
        "rate_limit"
    }

    fn process(&self, ctx: &FrameContext<'_>, state: &mut StepState) -> Result<(), SessionError> {
        let now = Instant::now();
        if now.duration_since(state.window_start) >= RATE_WINDOW {
            state.window_start = now;
            state.frames_in_window = 0;
        }

        state.frames_in_window += 1;
        if state.frames_in_window > self.per_second {
            warn!(
                match_id = ctx.match_id,
                user_id = ctx.user_id,
                limit = self.per_second,
                "Rate limit exceeded"
            );
            return Err(SessionError::RateLimited(self.per_second));
        }
        Ok(())
    }
}

/// Ordered steps; the first failure short-circuits the rest
#[derive(Default)]
pub struct MiddlewareChain {
    steps: Vec<Box<dyn InboundStep>>,
}

impl MiddlewareChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, step: impl InboundStep) -> Self {
        self.steps.push(Box::new(step));
        self
    }

    pub fn run(&self, ctx: &FrameContext<'_>, state: &mut StepState) -> Result<(), SessionError> {
        for step in &self.steps {
            step.process(ctx, state)?;
        }
        Ok(())
    }

    pub fn step_names(&self) -> Vec<&'static str> {
        self.steps.iter().map(|s| s.name()).collect()
    }
}

/// What connection setup has resolved so far
#[derive(Debug, Default)]
pub struct SetupContext {
    pub match_id: String,
    pub token: Option<String>,
    pub user_id: Option<UserId>,
    pub info: Option<MatchInfo>,
}

impl SetupContext {
    pub fn new(match_id: &str, token: Option<&str>) -> Self {
        Self {
            match_id: match_id.to_string(),
            token: token.map(str::to_string),
            ..Self::default()
        }
    }

    /// The user and match once every setup step has run
    pub fn resolved(self) -> Result<(UserId, MatchInfo), SessionError> {
        match (self.user_id, self.info) {
            (Some(user_id), Some(info)) => Ok((user_id, info)),
            _ => Err(SessionError::Internal(format!(
                "connection setup for match {} left user or match unresolved",
                self.match_id
            ))),
        }
    }
}

#[async_trait]
pub trait SetupStep: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    async fn process(&self, manager: &GameManager, ctx: &mut SetupContext)
    -> Result<(), SessionError>;
}

/// Bearer token to user id, under the auth deadline
pub struct Authenticate;

#[async_trait]
impl SetupStep for Authenticate {
    fn name(&self) -> &'static str {
        "authenticate"
    }

    async fn process(
        &self,
        manager: &GameManager,
        ctx: &mut SetupContext,
    ) -> Result<(), SessionError> {
        debug!(match_id = ctx.match_id, phase = ?ConnectionPhase::Authenticating, "Connection phase");
        let token = ctx
            .token
            .as_deref()
            .map(|t| t.strip_prefix("Bearer ").unwrap_or(t).trim())
            .filter(|t| !t.is_empty())
            .ok_or(SessionError::MissingToken)?;
        let user_id = manager.authenticate(token).await?;
        ctx.user_id = Some(user_id);
        Ok(())
    }
}

/// Match lookup plus the participant and finished checks
pub struct ValidateMatch;

#[async_trait]
impl SetupStep for ValidateMatch {
    fn name(&self) -> &'static str {
        "validate_match"
    }

    async fn process(
        &self,
        manager: &GameManager,
        ctx: &mut SetupContext,
    ) -> Result<(), SessionError> {
        let user_id = ctx.user_id.as_deref().ok_or_else(|| {
            SessionError::Internal("match validation ran before authentication".to_string())
        })?;
        debug!(match_id = ctx.match_id, user_id, phase = ?ConnectionPhase::Validating, "Connection phase");
        let info = manager.validate_match(&ctx.match_id, user_id).await?;
        ctx.info = Some(info);
        Ok(())
    }
}

/// Ordered setup steps; the first failure rejects the connection
#[derive(Default)]
pub struct SetupChain {
    steps: Vec<Box<dyn SetupStep>>,
}

impl SetupChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, step: impl SetupStep) -> Self {
        self.steps.push(Box::new(step));
        self
    }

    pub async fn run(
        &self,
        manager: &GameManager,
        ctx: &mut SetupContext,
    ) -> Result<(), SessionError> {
        for step in &self.steps {
            step.process(manager, ctx).await?;
        }
        Ok(())
    }

    pub fn step_names(&self) -> Vec<&'static str> {
        self.steps.iter().map(|s| s.name()).collect()
    }
}
