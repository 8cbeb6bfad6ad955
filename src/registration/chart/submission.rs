//! Nodes that call external services: catalog loading, submission, and quit.

use super::{reset_context, Node};
use crate::builder::{forward_to, InvokeBuilder, NodeBuilder, TransitionBuilder};
use crate::core::{Event, Patch};
use crate::effects::{resolve_with, Action};
use crate::patch;
use crate::registration::context::{Context, Disasters, Errors, Meta};
use crate::registration::events::{CLEAR_SESSION_STATE, GET_DISASTERS, NEXT, SUBMIT_APPLICATION};
use crate::registration::services::{fetch_disasters, registration_from, submit_application};
use serde_json::Value;

fn loading(flag: bool) -> Patch {
    Patch::new().set("meta", Meta { loading: Some(flag) })
}

fn server_error(failed: bool) -> Patch {
    Patch::new().set("errors", Errors { server: failed })
}

pub(super) fn pre_registration() -> Node {
    let catalog = fetch_disasters();

    NodeBuilder::compound("pre-registration")
        .id("pre-registration")
        .initial("loading")
        .entry(Action::persist())
        .exit(Action::set(patch! { "previousSection" => "pre-registration" }))
        .exit(Action::persist())
        .child(
            NodeBuilder::atomic("loading")
                .entry(Action::set(loading(true)))
                .invoke(
                    InvokeBuilder::new(GET_DISASTERS, move |c: &Context| catalog(c))
                        .on_done(TransitionBuilder::to("set-up").action(Action::assign(
                            |_: &Context, event: &Event| {
                                loading(false)
                                    .extend(server_error(false))
                                    .set("disasters", Disasters::from_value(&event.data))
                            },
                        )))
                        .on_error(TransitionBuilder::to("set-up").action(Action::assign(
                            |_: &Context, _: &Event| {
                                loading(false)
                                    .extend(server_error(true))
                                    .set("disasters", Disasters::default())
                            },
                        ))),
                ),
        )
        .child(
            NodeBuilder::atomic("set-up")
                .route("/form/pre-registration")
                .entry(Action::set(patch! {
                    "currentSection" => "pre-registration",
                    "currentStep" => "",
                }))
                .on(NEXT, forward_to("#get-prepared")),
        )
}

pub(super) fn submit() -> Node {
    let task = submit_application();

    NodeBuilder::compound("submit")
        .id("submit")
        .initial("sign-and-submit")
        .entry(Action::set(patch! {
            "currentSection" => "submit",
            "currentStep" => "sign-and-submit",
        }))
        .child(
            NodeBuilder::atomic("sign-and-submit")
                .route("/form/submit/sign-and-submit")
                .on(NEXT, forward_to("finalize")),
        )
        .child(
            NodeBuilder::atomic("finalize").invoke(
                InvokeBuilder::new(SUBMIT_APPLICATION, move |c: &Context| task(c))
                    .on_done(TransitionBuilder::to("#next-steps").actions([
                        Action::clear_storage(),
                        Action::assign(|c: &Context, event: &Event| {
                            let mut registration = registration_from(&event.data);
                            if let Some(applicant) = c.household.applicant() {
                                registration.applicant_name = applicant.name.full();
                            }
                            Context {
                                errors: Errors { server: false },
                                registration,
                                ..c.reset()
                            }
                            .to_patch()
                        }),
                    ]))
                    .on_error(
                        TransitionBuilder::to("sign-and-submit")
                            .action(Action::set(server_error(true))),
                    ),
            ),
        )
}

/// Clears the session, then returns to the welcome page.
pub(super) fn quit() -> Node {
    NodeBuilder::atomic("quit").invoke(
        InvokeBuilder::new(CLEAR_SESSION_STATE, |_: &Context| resolve_with(Value::Null))
            .on_done(
                TransitionBuilder::to("#welcome").actions([Action::clear_storage(), reset_context()]),
            ),
    )
}
