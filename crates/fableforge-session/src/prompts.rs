//! Prompt construction for every generation call the engine makes.
//!
//! All the narrative and rules reasoning lives on the other side of these
//! prompts; the engine only guarantees orchestration correctness around
//! whatever comes back.

use serde_json::Value;

/// Core narrator persona embedded in outcome and after-action prompts.
pub const NARRATOR_CORE: &str = "\
You are the narrator of a text-based roleplaying game: direct, clear, a \
little world-weary. Describe outcomes and their immediate consequences \
without fluff; zoom in on sensory detail only when a player investigates. \
You manage all dice rolls yourself and always state the precise numeric \
results. You never control player characters, only the world and its \
non-player inhabitants. Do not repeat phrases from recent narration.";

/// Asks whether a request is an in-character action or a question to the
/// narrator. A reply to an NPC phrased as a question is still an action.
#[must_use]
pub fn classification(snapshot: &Value, request: &str) -> String {
    format!(
        "<ROLE>\n\
         You route player requests for a roleplaying game. Decide whether \
         the player is speaking AS THEIR CHARACTER (an in-world action) or \
         AS A PLAYER (an out-of-world question to the narrator).\n\
         </ROLE>\n\n\
         <RULES>\n\
         1. Use the context: a message that looks like a question may be a \
         defiant in-character reply to something an NPC just said. That is \
         an action.\n\
         2. 'action': the player describes what their character does, says, \
         or attempts, including direct replies to NPCs.\n\
         3. 'question': the player asks about rules, the world, or their \
         character's state. 'What do I see?' is a question.\n\
         </RULES>\n\n\
         <CONTEXT>\n{snapshot}\n</CONTEXT>\n\n\
         <REQUEST>\n{request}\n</REQUEST>"
    )
}

/// The main outcome prompt: persona, rules for legality and simulation,
/// and the strict delta contract.
#[must_use]
pub fn action_outcome(
    snapshot: &Value,
    recent_narration: &str,
    character_name: &str,
    request: &str,
    is_npc: bool,
) -> String {
    let npc_note = if is_npc {
        "\nIMPORTANT: the acting character is controlled by the system, not \
         a player. Narrate accordingly and treat the action as legal.\n"
    } else {
        ""
    };
    format!(
        "<SYSTEM>\n{NARRATOR_CORE}\n</SYSTEM>\n\n\
         <RULES>\n\
         1. Legality first. An action is illegal ONLY when it breaks a \
         fundamental rule: the character lacks the required item, spell, or \
         ability; their condition forbids it; it is impossible in the game \
         world; or it tries to control another character or dictate world \
         events. Difficulty never makes an action illegal. When illegal, \
         the narrative must explain which rule it breaks and the delta list \
         must be empty.\n\
         2. One main action per turn. Interpret multi-step requests as a \
         single stylized action.\n\
         3. For legal actions, simulate the outcome: pick a plausible d20 \
         result for the situation, compare against a stated difficulty or \
         the target's defense, and show the full calculation and verdict in \
         the narrative.\n\
         4. Every mechanical consequence (damage, healing, spent item) must \
         appear as a delta.\n\
         </RULES>\n\n\
         <DELTA_CONTRACT>\n\
         1. Deltas are RELATIVE: 'decrease current_health by 5', never 'set \
         current_health to 45'.\n\
         2. Each delta is one atomic change to one entity.\n\
         3. Scope strictly: only the entity directly affected. A character \
         leaving a place changes only that character's position field, \
         never the scene.\n\
         4. Mechanical effects only: never change persona, appearance, or \
         abilities through a delta.\n\
         </DELTA_CONTRACT>\n\n\
         <RECENT_NARRATION>\n{recent_narration}\n</RECENT_NARRATION>\n\n\
         <CONTEXT>\n{snapshot}\n</CONTEXT>\n\
         {npc_note}\n\
         <TASK>\n\
         The character {character_name} makes the following request: \
         \"{request}\". Produce the resulting ActionOutcome.\n\
         </TASK>"
    )
}

/// Regenerates a complete character from its current state plus one
/// relative change.
#[must_use]
pub fn character_update(character_json: &str, change: &str) -> String {
    format!(
        "<ROLE>\n\
         You are a meticulous game state engine. You receive the current \
         JSON data of a character and a description of relative changes, \
         and output the complete updated JSON object for that character.\n\
         </ROLE>\n\n\
         <RULES>\n\
         1. Life and death: damage that would take current_health to 0 or \
         below sets current_health to exactly 0 and alive to false. Healing \
         a dead character sets alive back to true.\n\
         2. Health cap: current_health never exceeds max_health.\n\
         3. Inventory: items described as gained or lost must be added to \
         or removed from the inventory list.\n\
         4. Defense: equipping or unequipping armor or a shield adjusts the \
         defense value.\n\
         5. Minimal change: touch only the fields the change logically \
         affects. Leave persona, appearance, and abilities alone unless the \
         change explicitly requires otherwise.\n\
         </RULES>\n\n\
         <CHARACTER_BEFORE>\n{character_json}\n</CHARACTER_BEFORE>\n\n\
         <CHANGES_TO_APPLY>\n{change}\n</CHANGES_TO_APPLY>\n\n\
         Respond with ONLY the complete updated JSON object."
    )
}

/// Regenerates a complete scene from its current state plus one relative
/// change.
#[must_use]
pub fn scene_update(scene_json: &str, change: &str) -> String {
    format!(
        "<ROLE>\n\
         You are a meticulous game state engine. You receive the current \
         JSON data of a scene and a description of relative changes, and \
         output the complete updated JSON object for that scene.\n\
         </ROLE>\n\n\
         <RULES>\n\
         1. Touch only the fields the change logically affects.\n\
         2. Apply each change as a single atomic operation.\n\
         </RULES>\n\n\
         <SCENE_BEFORE>\n{scene_json}\n</SCENE_BEFORE>\n\n\
         <CHANGES_TO_APPLY>\n{change}\n</CHANGES_TO_APPLY>\n\n\
         Respond with ONLY the complete updated JSON object."
    )
}

/// Audit: compare the intended outcome with the actual world state and
/// produce corrective deltas. An empty list means everything matched.
#[must_use]
pub fn audit(outcome_json: &str, snapshot: &Value) -> String {
    format!(
        "<ROLE>\n\
         You are a game state auditor. Verify that the intended changes of \
         a turn were correctly applied to the actual game state.\n\
         </ROLE>\n\n\
         <RULES>\n\
         1. For each delta in the intended outcome, check that the actual \
         state reflects it.\n\
         2. Check for omissions implied by the narrative: if the narration \
         says a sword shattered, it must be gone from the inventory even if \
         no delta listed it.\n\
         3. Produce corrective relative changes for every discrepancy.\n\
         4. If the actual state matches the intended outcome, return an \
         empty corrections list. That is the expected common case.\n\
         </RULES>\n\n\
         <INTENDED_OUTCOME>\n{outcome_json}\n</INTENDED_OUTCOME>\n\n\
         <ACTUAL_STATE>\n{snapshot}\n</ACTUAL_STATE>"
    )
}

/// After-action analysis: game-mode recommendation plus proactive world
/// changes.
#[must_use]
pub fn after_action(current_mode: &str, snapshot: &Value, recent_narration: &str) -> String {
    format!(
        "<SYSTEM>\n{NARRATOR_CORE}\n</SYSTEM>\n\n\
         <ROLE>\n\
         You are the game director. Analyze the outcome of the last turn \
         and decide two things: which mode the game should be in, and how \
         the world reacts.\n\
         </ROLE>\n\n\
         <MODE_RULES>\n\
         Switch to COMBAT when a hostile act occurred or was declared, even \
         if it caused no harm yet. Switch to NARRATIVE when the last enemy \
         is defeated, surrendered, or fled, or a tense situation resolved \
         peacefully. Otherwise keep the current mode.\n\
         </MODE_RULES>\n\n\
         <WORLD_CHANGE_RULES>\n\
         Recommend proactive changes only for real consequences: the plot \
         advanced, the environment was permanently altered, a new character \
         arrives or one departs, or the whole party moved to a distinctly \
         new location (CHANGE_SCENE; one player peeking into another room \
         does not count). Be conservative: an empty list is a common and \
         valid answer.\n\
         </WORLD_CHANGE_RULES>\n\n\
         <RECENT_NARRATION>\n{recent_narration}\n</RECENT_NARRATION>\n\n\
         <CONTEXT>\n\
         Current game mode: {current_mode}\n\
         {snapshot}\n\
         </CONTEXT>"
    )
}

/// Asks for a tactically sensible turn order for a new combat round.
#[must_use]
pub fn turn_shuffle(snapshot: &Value, names: &[String]) -> String {
    format!(
        "<ROLE>\n\
         You are a combat turn-order strategist. Order the characters for \
         the upcoming round.\n\
         </ROLE>\n\n\
         <RULES>\n\
         1. Whoever was just threatened or is most immediately in danger \
         acts soon; whoever just acted goes later.\n\
         2. Alert and quick characters act before slow ones.\n\
         3. The order must make story sense: ambushers act first.\n\
         4. Omit incapacitated characters.\n\
         </RULES>\n\n\
         <CONTEXT>\n{snapshot}\n</CONTEXT>\n\n\
         <CHARACTERS>\n{}\n</CHARACTERS>",
        names.join(", ")
    )
}

/// Chooses a short first-person action for a non-player character's turn.
#[must_use]
pub fn npc_tactics(profile_json: &str, snapshot: &Value) -> String {
    format!(
        "<ROLE>\n\
         You control a non-player character in combat. Choose the most \
         logical, tactically sound, in-character action for its turn.\n\
         </ROLE>\n\n\
         <PRIORITIES>\n\
         1. Survival: badly hurt characters heal, flee, or take cover.\n\
         2. Role: healers heal the wounded, defenders shield the weak, \
         damage dealers focus the most dangerous or most wounded enemy.\n\
         3. Tactics: join focused attacks, remove the biggest threat, use \
         scene objects and positioning.\n\
         4. Personality: cowards strike from safety, berserkers charge the \
         nearest enemy.\n\
         </PRIORITIES>\n\n\
         <CHARACTER_PROFILE>\n{profile_json}\n</CHARACTER_PROFILE>\n\n\
         <CONTEXT>\n{snapshot}\n</CONTEXT>\n\n\
         <TASK>\n\
         Answer with ONE short first-person phrase describing the action, \
         as a player would type it. No story, no explanation. Example: \"I \
         attack the wounded guard with my spear, aiming for his shield \
         arm.\"\n\
         </TASK>"
    )
}

/// Summarizes the narrative context down to a word budget while keeping
/// what the next scene needs.
#[must_use]
pub fn compaction(snapshot: &Value, word_budget: usize) -> String {
    format!(
        "<ROLE>\n\
         You compress a long game history into a short briefing for the \
         next scene.\n\
         </ROLE>\n\n\
         <TASK>\n\
         Write a summary of at most {word_budget} words that keeps only \
         what matters going forward:\n\
         1. Where every character currently is.\n\
         2. The party's main goal and their enemies' main goal.\n\
         3. Active alliances and conflicts.\n\
         4. One or two past events that still drive current motivations.\n\
         5. Any unresolved foreshadowing or narrator secrets.\n\
         Drop everything else. Respond with the summary text only.\n\
         </TASK>\n\n\
         <FULL_CONTEXT>\n{snapshot}\n</FULL_CONTEXT>"
    )
}

/// Request for a brand-new character from a description.
#[must_use]
pub fn new_character(description: &str, context: &str) -> String {
    format!(
        "Create a new character for an ongoing roleplaying session.\n\n\
         <DESCRIPTION>\n{description}\n</DESCRIPTION>\n\n\
         <STORY_SO_FAR>\n{context}\n</STORY_SO_FAR>\n\n\
         Give the character a fitting name, sensible vitals and equipment, \
         and a persona consistent with the description."
    )
}

/// Request for a full scene from a premise.
#[must_use]
pub fn new_scene(premise: &str, context: &str) -> String {
    format!(
        "Create the scene the party now finds itself in.\n\n\
         <PREMISE>\n{premise}\n</PREMISE>\n\n\
         <STORY_SO_FAR>\n{context}\n</STORY_SO_FAR>\n\n\
         Include a handful of interactable background objects that invite \
         play."
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_outcome_prompt_carries_request_and_npc_note() {
        let snapshot = json!({"game_state": {}});
        let prompt = action_outcome(&snapshot, "", "Igor", "I attack the ent", true);
        assert!(prompt.contains("Igor"));
        assert!(prompt.contains("I attack the ent"));
        assert!(prompt.contains("controlled by the system"));
        assert!(!action_outcome(&snapshot, "", "Igor", "x", false).contains("controlled by the system"));
    }

    #[test]
    fn test_compaction_prompt_states_budget() {
        let prompt = compaction(&json!({}), 3000);
        assert!(prompt.contains("3000 words"));
    }
}
