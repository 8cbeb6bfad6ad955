//! Household section: size, member names, and a details page per member.
//!
//! The member loop visits `members[1..]` (the applicant answered for
//! themselves in basic info). `household.currentMemberIndex` points at the
//! last member whose details were collected.

use super::{page, section, Node};
use crate::builder::{forward_to, goto, goto_if, NodeBuilder, TransitionBuilder};
use crate::effects::Action;
use crate::core::Patch;
use crate::registration::context::Context;
use crate::registration::events::{DECREMENT_CURRENT_MEMBER_INDEX, NEXT};

fn set_cursor(index: impl Fn(&Context) -> usize + Send + Sync + 'static) -> Action<Context> {
    Action::assign(move |c: &Context, _| {
        Patch::new().set("household", c.household.with_cursor(index(c)))
    })
}

pub(super) fn household() -> Node {
    section("household", 3)
        .initial("how-many")
        .on(
            DECREMENT_CURRENT_MEMBER_INDEX,
            goto_if(".how-many", |c: &Context| c.household.count() <= 1),
        )
        .on(
            DECREMENT_CURRENT_MEMBER_INDEX,
            goto_if(".get-prepared", |c: &Context| {
                c.household.current_member_index == 0
            }),
        )
        .on(
            DECREMENT_CURRENT_MEMBER_INDEX,
            TransitionBuilder::to(".member-details-loop")
                .action(set_cursor(|c| c.household.current_member_index.saturating_sub(1)))
                .action(Action::persist()),
        )
        .child(page("household", "how-many").on(NEXT, forward_to("member-info-branch")))
        .child(
            NodeBuilder::atomic("member-info-branch")
                .always(goto_if("member-names", |c: &Context| c.household.count() > 1))
                .always(goto("food-assistance")),
        )
        .child(
            page("household", "member-names")
                .entry(set_cursor(|_| 0))
                .on(NEXT, forward_to("get-prepared")),
        )
        .child(page("household", "get-prepared").on(NEXT, forward_to("member-details-loop")))
        .child(
            NodeBuilder::atomic("member-details-loop")
                .always(goto_if("member-details", |c: &Context| {
                    c.household.has_additional_members()
                }))
                .always(goto("food-assistance")),
        )
        .child(page("household", "member-details").on(NEXT, forward_to("member-details-next")))
        .child(
            NodeBuilder::atomic("member-details-next").always(
                TransitionBuilder::to("member-details-loop")
                    .action(set_cursor(|c| c.household.current_member_index + 1)),
            ),
        )
        .child(page("household", "food-assistance").on(NEXT, forward_to("#impact")))
}
