//! Reply ordering.
//!
//! In completion order every result is released as it arrives. In arrival
//! order whole batches are released in the order their units were read,
//! while results inside the head batch still stream out as they complete.

use std::collections::BTreeMap;

use hostctl_config::ReplyOrder;

use super::event::{ChannelEvent, Reply};

#[derive(Debug, Default)]
struct BatchSlot {
    expected: Option<usize>,
    released: usize,
    held: Vec<Reply>,
}

impl BatchSlot {
    fn is_complete(&self) -> bool {
        self.expected == Some(self.released) && self.held.is_empty()
    }
}

/// Decides when replies may be written.
#[derive(Debug)]
pub(crate) struct ReplySequencer {
    order: ReplyOrder,
    next_batch: u64,
    batches: BTreeMap<u64, BatchSlot>,
}

impl ReplySequencer {
    pub(crate) const fn new(order: ReplyOrder) -> Self {
        Self {
            order,
            next_batch: 0,
            batches: BTreeMap::new(),
        }
    }

    /// Records `event` and returns the replies it releases, in write order.
    pub(crate) fn accept(&mut self, event: ChannelEvent) -> Vec<Reply> {
        match self.order {
            ReplyOrder::Completion => match event {
                ChannelEvent::Submitted { .. } => Vec::new(),
                ChannelEvent::Completed {
                    request,
                    result,
                    quit,
                    ..
                } => vec![Reply::Result {
                    request,
                    result,
                    quit,
                }],
                ChannelEvent::Rejected { error, .. } => vec![Reply::Error(error)],
            },
            ReplyOrder::Arrival => {
                self.hold(event);
                self.release()
            }
        }
    }

    /// Whether replies are still held back.
    pub(crate) fn is_idle(&self) -> bool {
        self.batches.values().all(|slot| slot.held.is_empty())
    }

    fn hold(&mut self, event: ChannelEvent) {
        match event {
            ChannelEvent::Submitted { batch, requests } => {
                self.batches.entry(batch).or_default().expected = Some(requests);
            }
            ChannelEvent::Completed {
                batch,
                request,
                result,
                quit,
            } => self.batches.entry(batch).or_default().held.push(Reply::Result {
                request,
                result,
                quit,
            }),
            ChannelEvent::Rejected { batch, error } => {
                let slot = self.batches.entry(batch).or_default();
                slot.expected = Some(1);
                slot.held.push(Reply::Error(error));
            }
        }
    }

    fn release(&mut self) -> Vec<Reply> {
        let mut released = Vec::new();
        while let Some(slot) = self.batches.get_mut(&self.next_batch) {
            slot.released += slot.held.len();
            released.append(&mut slot.held);
            if !slot.is_complete() {
                break;
            }
            self.batches.remove(&self.next_batch);
            self.next_batch += 1;
        }
        released
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::protocol::{ActionRequest, ActionResult, ChannelError, Origin, ReplyShape};
    use crate::session::Action;

    fn completed(batch: u64, name: &str) -> ChannelEvent {
        let request = ActionRequest::single(
            Action::new(name, Vec::<String>::new()),
            Origin::Legacy,
            ReplyShape::Legacy,
        );
        let result = ActionResult {
            correlation: request.correlation(),
            success: true,
            text: vec![name.to_owned()],
            completed_at: 0,
            elapsed: Duration::ZERO,
        };
        ChannelEvent::Completed {
            batch,
            request,
            result,
            quit: false,
        }
    }

    fn names(replies: Vec<Reply>) -> Vec<String> {
        replies
            .into_iter()
            .map(|reply| match reply {
                Reply::Result { request, .. } => request.name().to_owned(),
                Reply::Error(error) => error.message().to_owned(),
            })
            .collect()
    }

    #[test]
    fn completion_order_releases_immediately() {
        let mut sequencer = ReplySequencer::new(ReplyOrder::Completion);
        assert!(
            sequencer
                .accept(ChannelEvent::Submitted {
                    batch: 0,
                    requests: 1
                })
                .is_empty()
        );
        assert!(
            sequencer
                .accept(ChannelEvent::Submitted {
                    batch: 1,
                    requests: 1
                })
                .is_empty()
        );
        assert_eq!(names(sequencer.accept(completed(1, "Quick"))), ["Quick"]);
        assert_eq!(names(sequencer.accept(completed(0, "Slow"))), ["Slow"]);
    }

    #[test]
    fn arrival_order_holds_later_batches() {
        let mut sequencer = ReplySequencer::new(ReplyOrder::Arrival);
        let _ = sequencer.accept(ChannelEvent::Submitted {
            batch: 0,
            requests: 1,
        });
        let _ = sequencer.accept(ChannelEvent::Submitted {
            batch: 1,
            requests: 1,
        });
        assert!(sequencer.accept(completed(1, "Quick")).is_empty());
        assert!(!sequencer.is_idle());
        assert_eq!(
            names(sequencer.accept(completed(0, "Slow"))),
            ["Slow", "Quick"]
        );
        assert!(sequencer.is_idle());
    }

    #[test]
    fn arrival_order_streams_within_the_head_batch() {
        let mut sequencer = ReplySequencer::new(ReplyOrder::Arrival);
        let _ = sequencer.accept(ChannelEvent::Submitted {
            batch: 0,
            requests: 2,
        });
        assert_eq!(names(sequencer.accept(completed(0, "Quick"))), ["Quick"]);
        assert_eq!(names(sequencer.accept(completed(0, "Slow"))), ["Slow"]);
    }

    #[test]
    fn rejected_units_keep_their_place() {
        let mut sequencer = ReplySequencer::new(ReplyOrder::Arrival);
        let _ = sequencer.accept(ChannelEvent::Submitted {
            batch: 0,
            requests: 1,
        });
        let rejected = ChannelEvent::Rejected {
            batch: 1,
            error: ChannelError::semantic("Not a struct", ReplyShape::Flat),
        };
        assert!(sequencer.accept(rejected).is_empty());
        assert_eq!(
            names(sequencer.accept(completed(0, "Set"))),
            ["Set", "Not a struct"]
        );
    }

    #[test]
    fn completion_may_precede_its_submission_record() {
        let mut sequencer = ReplySequencer::new(ReplyOrder::Arrival);
        assert_eq!(names(sequencer.accept(completed(0, "Fast"))), ["Fast"]);
        let _ = sequencer.accept(ChannelEvent::Submitted {
            batch: 0,
            requests: 2,
        });
        assert_eq!(names(sequencer.accept(completed(0, "Next"))), ["Next"]);
        assert!(sequencer.is_idle());
    }
}
