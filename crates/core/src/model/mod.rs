mod answer;
mod ids;
mod player;
mod question;
mod role;
mod session;
mod stage;

pub use ids::{ParseIdError, PlayerId, QuestionId, SessionId};

pub use answer::{AnswerLog, AnswerStats};
pub use player::{PLAYER_NAME_MAX_LEN, Player, PlayerError, normalize_player_name};
pub use question::{Choice, ChoiceError, Question, QuestionDraft, QuestionError};
pub use role::{Role, RoleError, RolePerk};
pub use session::{GameSession, PerkFlags};
pub use stage::{STAGE_MAX, Stage, StageError};
