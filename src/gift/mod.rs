//! Gift lifecycles: the maker flow, the taker flow and the history view.

mod history;
pub use history::GiftHistory;

mod maker;
pub use maker::{GiftForm, GiftMaker, MakerError, MakerEvent, MakerNotice, MakerPhase, MakerState};

mod taker;
pub use taker::{AbortReason, GiftTaker, TakerError, TakerEvent, TakerState};
