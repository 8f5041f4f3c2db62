mod collaborators;

pub use collaborators::{
    AuthError, Authenticator, MatchDirectory, MatchInfo, ParticipantScore, Settlement,
    SettlementOutcome, StoreError, UserId,
};
