//! Canned replies posted back to the channel.

/// Reply to `help`.
pub const HELP: &str = "I can respond to the following commands: \n 'add: <restaurant>' - add a restaurant to my database \n 'view-all' - show you all the restaurants in the database \n 'recommendation' - I'll pick a place at random";

/// Reply to `view-all` when there is nothing to show.
pub const NOTHING_TO_VIEW: &str = "There are no places on the list yet. Try 'add: <restaurant>'.";

/// Reply to `recommendation` when there is nothing to pick from.
pub const NOTHING_TO_RECOMMEND: &str = "I don't know any places yet, so I can't recommend one. Try 'add: <restaurant>'.";

/// Follow-up to the welcome message.
pub const WELCOME_PUN: &str = "... It's a pun.";

/// First line of the first-run welcome.
pub fn welcome(name: &str) -> String {
    format!("Hi guys, I'm {name}! I can help you select today's LunchSpot. LunchBot... LunchSpot... Get it?")
}

/// Reply to `add:`.
pub fn added(spot: &str) -> String {
    format!("I added {spot} to the list of places.")
}

/// Reply to `remove:` when something matched.
pub fn removed(spot: &str) -> String {
    format!("I removed {spot} from the list of places.")
}

/// Reply to `remove:` when nothing matched.
pub fn not_found(spot: &str) -> String {
    format!("I couldn't find {spot} in the list of places.")
}

/// Reply when `add:` / `remove:` came without a place name.
pub fn missing_name(keyword: &str) -> String {
    format!("You need to tell me which place, e.g. '{keyword} <restaurant>'.")
}

/// Reply to `recommendation`.
pub fn recommendation(spot: &str) -> String {
    format!("Why not try {spot}?")
}

/// Reply to `view-all`: one name per line.
pub fn spot_list<S: AsRef<str>>(names: &[S]) -> String {
    names.iter().fold(String::new(), |mut acc, name| {
        acc.push_str(name.as_ref());
        acc.push('\n');
        acc
    })
}
