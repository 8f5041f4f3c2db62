use crate::config::SessionConfig;
use crate::game::core::{Authenticator, MatchDirectory, MatchInfo, Settlement, UserId};
use crate::game::error::SessionError;
use crate::game::messages::{Outbound, ServerMessage};
use crate::game::middleware::{
    Authenticate, FrameContext, MiddlewareChain, RateLimit, RecordActivity, SetupChain,
    SetupContext, StepState, ValidateMatch,
};
use crate::game::monitor::ConnectionMonitor;
use crate::game::registry::{Connection, GameStateRegistry, PlayerRegistry, SocketHandle};
use crate::game::router::{Route, route_frame};
use crate::game::session::Session;
use crate::metrics::Metrics;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// External systems the session core depends on
#[derive(Clone)]
pub struct Collaborators {
    pub authenticator: Arc<dyn Authenticator>,
    pub matches: Arc<dyn MatchDirectory>,
    pub settlement: Arc<dyn Settlement>,
}

/// Public facade over engines, registries, monitor and collaborators.
/// Built once at process start; every connection task holds an `Arc` to it.
pub struct GameManager {
    pub config: SessionConfig,
    pub games: Arc<GameStateRegistry>,
    pub players: Arc<PlayerRegistry>,
    pub monitor: Arc<ConnectionMonitor>,
    pub metrics: Arc<Metrics>,
    setup: SetupChain,
    middleware: MiddlewareChain,
    collaborators: Collaborators,
}

impl GameManager {
    pub fn new(
        config: SessionConfig,
        collaborators: Collaborators,
        metrics: Arc<Metrics>,
    ) -> Arc<Self> {
        let games = Arc::new(GameStateRegistry::new());
        let players = Arc::new(PlayerRegistry::new());
        let monitor = Arc::new(ConnectionMonitor::new(
            players.clone(),
            metrics.clone(),
            config.heartbeat_interval,
            config.heartbeat_timeout,
        ));
        let setup = SetupChain::new().with(Authenticate).with(ValidateMatch);
        let middleware = MiddlewareChain::new()
            .with(RecordActivity::new(players.clone(), metrics.clone()))
            .with(RateLimit::new(config.rate_limit_per_sec));

        Arc::new(Self {
            config,
            games,
            players,
            monitor,
            metrics,
            setup,
            middleware,
            collaborators,
        })
    }

    /// Start the liveness loop; failed connections trigger match cleanup.
    pub fn spawn_monitor(self: &Arc<Self>) -> JoinHandle<()> {
        let manager = Arc::downgrade(self);
        self.monitor.clone().spawn(Arc::new(move |match_id: &str, user_id: &str| {
            if let Some(manager) = manager.upgrade() {
                manager.after_departure(match_id, user_id);
            }
        }))
    }

    pub(crate) fn settlement(&self) -> &dyn Settlement {
        self.collaborators.settlement.as_ref()
    }

    /// Authenticate under the configured deadline
    pub async fn authenticate(&self, token: &str) -> Result<UserId, SessionError> {
        let deadline = self.config.auth_timeout;
        match tokio::time::timeout(deadline, self.collaborators.authenticator.authenticate(token))
            .await
        {
            Ok(result) => Ok(result?),
            Err(_) => Err(SessionError::AuthTimeout(deadline)),
        }
    }

    /// Resolve the match and check that `user_id` may play in it
    pub async fn validate_match(
        &self,
        match_id: &str,
        user_id: &str,
    ) -> Result<MatchInfo, SessionError> {
        let info = self
            .collaborators
            .matches
            .find_match(match_id)
            .await
            .map_err(SessionError::Lookup)?
            .ok_or_else(|| SessionError::MatchNotFound(match_id.to_string()))?;

        if !info.has_participant(user_id) {
            return Err(SessionError::NotParticipant {
                match_id: match_id.to_string(),
                user_id: user_id.to_string(),
            });
        }
        if info.finished {
            return Err(SessionError::MatchFinished(match_id.to_string()));
        }
        Ok(info)
    }

    /// Run the connection-setup steps, resolving who is connecting to which match
    pub async fn resolve(
        &self,
        match_id: &str,
        token: Option<&str>,
    ) -> Result<(UserId, MatchInfo), SessionError> {
        let mut ctx = SetupContext::new(match_id, token);
        self.setup.run(self, &mut ctx).await?;
        ctx.resolved()
    }

    /// Register the socket for (match, user), refusing a second live connection
    pub fn register(&self, info: &MatchInfo, user_id: &str, socket: SocketHandle) -> Result<Session, SessionError> {
        let connection = Connection::new(&info.match_id, user_id, socket.clone());
        let connection_id = connection.id;

        if !self.players.add_connection(connection) {
            return Err(SessionError::DuplicateConnection(user_id.to_string()));
        }

        info!(
            match_id = info.match_id,
            user_id,
            game_kind = %info.game_kind,
            connections = self.players.connection_count(&info.match_id),
            "Connection registered"
        );

        Ok(Session {
            match_id: info.match_id.clone(),
            user_id: user_id.to_string(),
            kind: info.game_kind,
            connection_id,
            socket,
        })
    }

    /// Middleware, validation and dispatch for one inbound text frame
    pub async fn process_frame(
        &self,
        session: &Session,
        text: &str,
        state: &mut StepState,
    ) -> Result<(), SessionError> {
        let ctx = FrameContext {
            match_id: &session.match_id,
            user_id: &session.user_id,
        };
        self.middleware.run(&ctx, state)?;

        let route = route_frame(text, self.config.max_message_bytes)?;
        debug!(
            match_id = session.match_id,
            user_id = session.user_id,
            route = route.name(),
            "Routing frame"
        );

        match route {
            Route::Join => self.join(session).await,
            Route::Move(payload) => self.make_move(session, &payload).await,
            Route::Restart => self.restart(session).await,
            Route::StateQuery => self.send_state(session).await,
            Route::Relay { kind, raw } => {
                self.relay(session, &kind, raw);
                Ok(())
            }
        }
    }

    /// Deregister a closed connection and clean up or notify the rest of the match
    pub fn disconnect(&self, session: &Session) {
        self.metrics.connection_closed();
        let registered = self.players.connection_id(&session.match_id, &session.user_id)
            == Some(session.connection_id);
        if !registered {
            // Already dropped by the liveness sweep, or replaced by a newer socket
            return;
        }
        self.players
            .remove_connection(&session.match_id, &session.user_id, session.connection_id);
        self.after_departure(&session.match_id, &session.user_id);
    }

    /// Destroy the match state once its last connection is gone; otherwise tell the others.
    fn after_departure(&self, match_id: &str, user_id: &str) {
        if self.players.has_live_connection(match_id, user_id) {
            // The user already reconnected on a new socket
            return;
        }

        let released = self.players.release_if_idle(match_id, || {
            self.games.remove(match_id);
        });
        if released {
            info!(match_id, "Last connection closed, match state released");
            return;
        }

        let symbol = self.players.get_symbol(match_id, user_id);
        self.players.broadcast(
            match_id,
            Outbound::Frame(ServerMessage::PlayerLeft {
                user_id: user_id.to_string(),
                symbol,
            }),
        );
        info!(match_id, user_id, "Player left");
    }
}
