//! Resources section: assets, then income and jobs for every member with income.
//!
//! Two nested loops. The outer one walks `resources.membersWithIncome` with
//! `resources.currentMemberIndex`; the inner one walks the current member's
//! jobs with `assetsAndIncome.currentJobIndex`. Each loop is a decision
//! node, a page, and an advance node. Backward navigation uses the
//! `DECREMENT_*` events, which step the cursor back or, at index 0, leave
//! the loop through its entry decision.

use super::{page, section, Node};
use crate::builder::{forward_to, goto, goto_if, NodeBuilder, TransitionBuilder};
use crate::core::Patch;
use crate::effects::Action;
use crate::registration::context::{AssetsAndIncome, Context, Job, Resources};
use crate::registration::events::{DECREMENT_CURRENT_JOB_INDEX, DECREMENT_CURRENT_MEMBER_INDEX, NEXT};

fn set_member_cursor(index: impl Fn(&Resources) -> usize + Send + Sync + 'static) -> Action<Context> {
    Action::assign(move |c: &Context, _| {
        Patch::new().set("resources", c.resources.with_cursor(index(&c.resources)))
    })
}

fn set_job_cursor(
    index: impl Fn(&AssetsAndIncome) -> usize + Send + Sync + 'static,
) -> Action<Context> {
    Action::assign(move |c: &Context, _| {
        let household = c.with_resource_member(|member| {
            let next = index(&member.assets_and_income);
            member.assets_and_income.current_job_index = next;
        });
        Patch::new().set("household", household)
    })
}

/// Make sure the job under the cursor exists, appending a blank one if not.
fn open_job() -> Action<Context> {
    Action::assign(|c: &Context, _| {
        let household = c.with_resource_member(|member| {
            let income = &mut member.assets_and_income;
            if income.jobs.get(income.current_job_index).is_none() {
                member.has_other_jobs = if income.jobs.is_empty() {
                    None
                } else {
                    Some(false)
                };
                income.current_job_index = income.jobs.len();
                income.jobs.push(Job::default());
            }
        });
        Patch::new().set("household", household)
    })
}

/// Move the job cursor back one, clamped at the first job.
///
/// Re-arms `hasOtherJobs` while jobs remain, so the loop walks forward over
/// the jobs already collected instead of leaving for the next member.
fn step_back_job() -> Action<Context> {
    Action::assign(|c: &Context, _| {
        let household = c.with_resource_member(|member| {
            let income = &mut member.assets_and_income;
            income.current_job_index = income.current_job_index.saturating_sub(1);
            member.has_other_jobs = Some(!income.jobs.is_empty());
        });
        Patch::new().set("household", household)
    })
}

fn member_has_job(c: &Context) -> bool {
    c.resource_member().is_some_and(|member| member.has_job())
}

fn member_has_other_jobs(c: &Context) -> bool {
    c.resource_member().is_some_and(|member| member.has_other_jobs())
}

fn at_first_job(c: &Context) -> bool {
    c.resource_member()
        .is_none_or(|member| member.assets_and_income.current_job_index == 0)
}

pub(super) fn resources() -> Node {
    section("resources", 5)
        .initial("assets")
        .on(
            DECREMENT_CURRENT_MEMBER_INDEX,
            goto_if(".assets", |c: &Context| c.resources.current_member_index == 0),
        )
        .on(
            DECREMENT_CURRENT_MEMBER_INDEX,
            TransitionBuilder::to(".check-member")
                .action(set_member_cursor(Resources::previous_member_index))
                .action(Action::persist()),
        )
        .on(
            DECREMENT_CURRENT_JOB_INDEX,
            goto_if(".income-branch", at_first_job)
                .action(step_back_job())
                .action(Action::persist()),
        )
        .on(
            DECREMENT_CURRENT_JOB_INDEX,
            TransitionBuilder::to(".jobs-branch")
                .action(step_back_job())
                .action(Action::persist()),
        )
        .child(
            page("resources", "assets")
                .entry(set_member_cursor(|_| 0))
                .on(NEXT, forward_to("income-branch")),
        )
        .child(
            NodeBuilder::atomic("income-branch")
                .always(goto_if("income", |c: &Context| c.resources.has_pending_members()))
                .always(goto("#review").action(Action::persist())),
        )
        .child(
            page("resources", "income")
                .entry(set_job_cursor(|_| 0))
                .on(NEXT, forward_to("jobs-branch")),
        )
        .child(
            NodeBuilder::atomic("jobs-branch")
                .always(goto_if("jobs", member_has_job))
                .always(goto("next-member")),
        )
        .child(
            page("resources", "jobs")
                .entry(open_job())
                .on(NEXT, forward_to("other-jobs-loop")),
        )
        .child(
            NodeBuilder::atomic("other-jobs-loop")
                .always(
                    TransitionBuilder::to("jobs-branch")
                        .when(member_has_other_jobs)
                        .action(set_job_cursor(|income| income.current_job_index + 1)),
                )
                .always(goto("next-member")),
        )
        .child(
            NodeBuilder::atomic("next-member").always(
                TransitionBuilder::to("income-branch")
                    .action(set_member_cursor(|resources| resources.current_member_index + 1))
                    .action(Action::persist()),
            ),
        )
        .child(
            NodeBuilder::atomic("check-member")
                .always(
                    TransitionBuilder::to("jobs")
                        .when(member_has_job)
                        .action(set_job_cursor(|income| income.jobs.len().saturating_sub(1))),
                )
                .always(goto("income")),
        )
}
