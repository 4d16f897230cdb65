// Interpreter context messages
//
// The behavioral contract is sent once per interpreter session; the control
// map is sent whenever a screen's target set becomes authoritative, and a
// short notice accompanies every navigation.

use crate::targets::TargetRegistry;

/// Expected acknowledgement of the behavioral contract
pub const INITIAL_CONTRACT_ACK: &str = "OK - INSTRUCTIONS";
/// Expected acknowledgement of a control map
pub const SCREEN_MAP_ACK: &str = "OK - MAP";

const INSTRUCTION_SET: &str = r#"--- Instruction set ---
You will receive commands related to an application interface. The commands are in natural speech. Based on the command you should decide which control matches the command, and answer with the id of that control, or the additional information described below.

Controls are part of screens. Each control can be identified by its id. In different screens there are different controls with different ids. The detailed map of controls comes later, from the prompts that contain "control mapping" for each screen.

This is the shape of a control entry in the mapping:
{
  "id": "97439C4E-C8C7-4E37-A6C4-405A0B1C3A07",
  "frame": { "x": -11, "y": -15, "width": 23, "height": 30 },
  "title": null,
  "image": null,
  "accessibility": null,
  "description": "Back button leading from the item detail to the home screen.",
  "color": null,
  "type": "button",
  "screen": "Detail"
}

Example of a command and your answer: "I would like to select car."
You find the best control id matching the command within the current screen and return exactly:
{
 "id": "B25CEC9E-9C0E-484E-B933-A67A5C9FC10F"
}

Example of a command and your answer: "I would like to search for a car."
Your answer is the best matching control, e.g. a search text field, together with the subject of the command as the key:
{
 "id": "B25CEC9E-9C0E-484E-B933-A67A5C9FC10F",
 "key": "car"
}

For a negative command (no, go back, clear the search) against a text field, return an empty string key:
{
 "id": "B25CEC9E-9C0E-484E-B933-A67A5C9FC10F",
 "key": ""
}

For a slider control, the key is the numeric position, e.g.:
{
 "id": "B25CEC9E-9C0E-484E-B933-A67A5C9FC10F",
 "key": "15.0"
}

For a control that sets a count of items, the key is the whole number, e.g.:
{
 "id": "B25CEC9E-9C0E-484E-B933-A67A5C9FC10F",
 "key": "15"
}

The key can be missing when no key value makes sense, like for a simple button.

If you do not understand the context, even after several inputs, reply just "OK" and wait until it makes sense to you which control is wanted. The user may change topic; you are probably not the only agent they talk to. Do not rush a reply: when unsure, answer 'OK' and nothing else.

When screens switch, select controls from the mapping of the screen you were last told is active.

DO NOT ANSWER ANYTHING ELSE which does not fit in this instruction set.
DO NOT APOLOGISE.
DO NOT ENGAGE IN A NORMAL CONVERSATION STYLE OF ANSWERS.

Reply on this specific instruction prompt just with "OK - INSTRUCTIONS"."#;

/// The fixed behavioral contract, sent once per interpreter session
pub fn initial_contract() -> String {
    INSTRUCTION_SET.to_string()
}

/// The serialized control map of one screen, without handler capabilities
pub fn controls_map(registry: &TargetRegistry, screen: &str) -> String {
    match serde_json::to_string_pretty(&registry.snapshot(screen)) {
        Ok(json) => json,
        Err(error) => format!("Encoding error: {}", error),
    }
}

/// Authoritative control map message for one screen; replaces any earlier map
pub fn screen_contract(registry: &TargetRegistry, screen: &str) -> String {
    format!(
        "You are now in the screen \"{}\".\n\
         Forget previous mapping and use the following control mapping:\n\
         {}\n\
         On this prompt reply just with \"{}\".",
        screen,
        controls_map(registry, screen),
        SCREEN_MAP_ACK
    )
}

/// Short notice that the active screen changed, sent on every navigation
pub fn screen_enter_notice(screen: &str) -> String {
    format!(
        "You are now in the screen called: {}. Reply just with \"OK - {} SCREEN\".",
        screen,
        screen.to_uppercase()
    )
}
