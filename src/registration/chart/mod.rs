//! The registration wizard chart.
//!
//! `app` idles until the caller enters `#welcome`. Everything after the
//! welcome page lives under `#form`, one compound node per wizard section.
//! Pages record `currentSection` / `currentStep` on entry and the previous
//! ones on exit so the rendering layer always knows what to show, and
//! `NEXT` merges the submitted page into the context and persists it.

mod household;
mod resources;
mod submission;

use super::context::Context;
use super::events::{EDIT, EXIT, NEXT, QUIT, RESET, RESET_CURRENT_RESOURCE_MEMBER_INDEX};
use super::services::Services;
use crate::builder::{forward_to, goto, goto_if, NodeBuilder, TransitionBuilder};
use crate::effects::Action;
use crate::patch;

pub(crate) type Node = NodeBuilder<Context, Services>;

/// Root of the wizard chart.
pub fn app() -> Node {
    NodeBuilder::compound("app")
        .initial("idle")
        .child(NodeBuilder::atomic("idle"))
        .child(welcome())
        .child(form())
}

/// Section node: records the section and its progress step.
pub(crate) fn section(key: &'static str, step: u32) -> Node {
    NodeBuilder::compound(key)
        .id(key)
        .entry(Action::set(patch! { "currentSection" => key, "step" => step }))
        .entry(Action::persist())
        .exit(Action::set(patch! { "previousSection" => key }))
        .exit(Action::persist())
}

/// Page node routed at `/form/<section>/<key>`.
pub(crate) fn page(section: &str, key: &'static str) -> Node {
    NodeBuilder::atomic(key)
        .route(format!("/form/{section}/{key}"))
        .entry(Action::set(patch! { "currentStep" => key }))
        .entry(Action::persist())
        .exit(Action::set(patch! { "previousStep" => key }))
        .exit(Action::persist())
}

/// Replace the whole context with a fresh one, keeping config and catalog.
pub(crate) fn reset_context() -> Action<Context> {
    Action::assign(|context: &Context, _| context.reset().to_patch())
}

fn welcome() -> Node {
    NodeBuilder::compound("welcome")
        .id("welcome")
        .initial("welcome")
        .child(
            NodeBuilder::atomic("welcome")
                .route("/welcome")
                .entry(Action::set(patch! { "currentSection" => "welcome", "currentStep" => "" }))
                .entry(Action::persist())
                .exit(Action::set(patch! { "previousSection" => "welcome" }))
                .exit(Action::persist())
                .on(NEXT, forward_to("#form")),
        )
}

fn form() -> Node {
    NodeBuilder::compound("form")
        .id("form")
        .initial("pre-registration")
        .entry(Action::set(patch! { "prefix" => "form" }))
        .exit(Action::set(patch! { "prefix" => "" }))
        .on(QUIT, goto(".quit"))
        .on(
            RESET,
            TransitionBuilder::to("#welcome").actions([Action::clear_storage(), reset_context()]),
        )
        .child(submission::pre_registration())
        .child(get_prepared())
        .child(basic_info())
        .child(identity())
        .child(household::household())
        .child(impact())
        .child(resources::resources())
        .child(review())
        .child(submission::submit())
        .child(next_steps())
        .child(submission::quit())
}

fn get_prepared() -> Node {
    NodeBuilder::atomic("get-prepared")
        .id("get-prepared")
        .route("/form/get-prepared")
        .entry(Action::set(patch! { "currentSection" => "get-prepared", "currentStep" => "" }))
        .exit(Action::set(patch! { "previousSection" => "get-prepared", "previousStep" => "" }))
        .on(NEXT, forward_to("#basic-info"))
}

fn basic_info() -> Node {
    section("basic-info", 1)
        .initial("applicant-name")
        .child(
            page("basic-info", "applicant-name")
                .entry(Action::log("enter applicant name"))
                .on(NEXT, forward_to("address")),
        )
        .child(page("basic-info", "address").on(NEXT, forward_to("mailing-address-check")))
        .child(
            NodeBuilder::atomic("mailing-address-check")
                .always(goto_if("mailing-address", |c: &Context| {
                    c.basic_info.needs_mailing_address()
                }))
                .always(goto("shortcut")),
        )
        .child(page("basic-info", "mailing-address").on(NEXT, forward_to("shortcut")))
        .child(
            page("basic-info", "shortcut")
                .on(EXIT, goto("#submit"))
                .on(NEXT, forward_to("#identity")),
        )
}

fn identity() -> Node {
    section("identity", 2)
        .initial("personal-info")
        .child(page("identity", "personal-info").on(NEXT, forward_to("#household")))
}

fn impact() -> Node {
    section("impact", 4)
        .initial("adverse-effects")
        .child(page("impact", "adverse-effects").on(NEXT, forward_to("#resources")))
}

fn review() -> Node {
    NodeBuilder::compound("review")
        .id("review")
        .initial("default")
        .entry(Action::set(patch! {
            "currentSection" => "review",
            "currentStep" => "review",
            "step" => 6,
        }))
        .entry(Action::persist())
        .exit(Action::set(patch! { "previousSection" => "review", "previousStep" => "review" }))
        .on(RESET_CURRENT_RESOURCE_MEMBER_INDEX, goto("#resources"))
        .child(
            NodeBuilder::atomic("default")
                .route("/form/review")
                .on(NEXT, forward_to("#submit"))
                .on(EDIT, goto("edit")),
        )
        .child(
            NodeBuilder::atomic("edit")
                .route("/form/review")
                .entry(Action::forward())
                .entry(Action::persist())
                .on(NEXT, forward_to("#submit")),
        )
}

fn next_steps() -> Node {
    NodeBuilder::compound("next-steps")
        .id("next-steps")
        .initial("eligibility")
        .entry(Action::set(patch! { "currentSection" => "next-steps" }))
        .child(
            NodeBuilder::atomic("eligibility")
                .always(goto_if("eligible", |c: &Context| c.registration.is_eligible()))
                .always(goto("ineligible")),
        )
        .child(
            NodeBuilder::final_node("eligible")
                .route("/form/next-steps/eligible")
                .entry(Action::set(patch! { "currentStep" => "eligible" })),
        )
        .child(
            NodeBuilder::final_node("ineligible")
                .route("/form/next-steps/ineligible")
                .entry(Action::set(patch! { "currentStep" => "ineligible" })),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::Chart;

    fn chart() -> Chart<Context, Services> {
        Chart::build(app()).unwrap()
    }

    #[test]
    fn chart_is_valid() {
        let chart = chart();

        for id in [
            "#welcome",
            "#form",
            "#pre-registration",
            "#get-prepared",
            "#basic-info",
            "#identity",
            "#household",
            "#impact",
            "#resources",
            "#review",
            "#submit",
            "#next-steps",
        ] {
            assert!(chart.lookup(id).is_some(), "missing {id}");
        }
    }

    #[test]
    fn pages_carry_routes() {
        let chart = chart();
        let route = |path: &str| chart.node(chart.lookup(path).unwrap()).route().map(str::to_string);

        assert_eq!(route("welcome.welcome").as_deref(), Some("/welcome"));
        assert_eq!(
            route("form.household.how-many").as_deref(),
            Some("/form/household/how-many")
        );
        assert_eq!(
            route("form.resources.jobs").as_deref(),
            Some("/form/resources/jobs")
        );
        assert_eq!(route("form.household.member-info-branch"), None);
    }

    #[test]
    fn form_sets_prefix_while_active() {
        use crate::interpreter::Interpreter;
        use std::sync::Arc;

        let mut wizard = Interpreter::new(Arc::new(chart()), Context::default());
        wizard.start_at("#identity").unwrap();
        assert_eq!(wizard.context().prefix, "form");

        wizard.send(NEXT);
        assert!(wizard.configuration().matches("form.household.how-many"));
        assert_eq!(wizard.context().prefix, "form");

        wizard.send(RESET);
        assert!(wizard.configuration().matches("welcome.welcome"));
        assert_eq!(wizard.context().prefix, "");
    }

    #[test]
    fn form_handles_quit_and_reset() {
        let chart = chart();
        let form = chart.node(chart.lookup("#form").unwrap());

        assert!(form.transitions(QUIT).is_some());
        assert!(form.transitions(RESET).is_some());
    }
}
