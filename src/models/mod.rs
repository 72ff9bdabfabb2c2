pub mod answer;
pub mod chat;
pub mod question;
pub mod todo;
pub mod token;
pub mod user;
pub mod vote;

pub use answer::{Answer, AnswerDto, AnswerInput};
pub use chat::{
    ChatChannel, ChatChannelDto, ChatChannelMember, ChatMessage, MemberDto, MemberRole, MessageDto,
};
pub use question::{Question, QuestionDto, QuestionInput, QuestionUpdate};
pub use todo::{Todo, TodoDto, TodoInput, TodoQuery, TodoStatus, TodoUpdate};
pub use token::{Token, TokenKind};
pub use user::{User, UserDto, UserRole, UserSummary};
pub use vote::{Vote, VoteSummary, VoteType};
