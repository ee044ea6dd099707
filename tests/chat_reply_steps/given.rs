//! Given steps for chat reply scenarios.

use super::world::ChatWorld;
use crate::test_helpers::ScriptedCompletion;
use rstest_bdd_macros::given;

#[given("no external credential is configured")]
fn no_credential(world: &mut ChatWorld) {
    world.install(None);
}

#[given("the external service fails every attempt")]
fn external_service_failing(world: &mut ChatWorld) {
    world.install(Some(ScriptedCompletion::failing()));
}

#[given(r#"the external service replies "{reply}""#)]
fn external_service_replying(world: &mut ChatWorld, reply: String) {
    world.install(Some(ScriptedCompletion::replying(&reply)));
}
