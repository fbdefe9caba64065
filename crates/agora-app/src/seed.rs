//! Demo-data generator.
//!
//! Fills an empty store with a believable small town of users, communities,
//! posts and conversations so the UI has something to render on first run.
//! Everything goes through the public store operations; this module is a
//! client of the core, not a backdoor into the schema.

use chrono::{Duration, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use tracing::{debug, info};

use agora_store::{
    Comment, Community, CommunityCategory, Database, Message, Post, StoreError, User,
};

/// How many of each entity the seed inserted.
///
/// `memberships` counts explicit joins; the owner membership every community
/// starts with is part of `communities`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedStats {
    pub users: usize,
    pub communities: usize,
    pub memberships: usize,
    pub posts: usize,
    pub comments: usize,
    pub likes: usize,
    pub conversations: usize,
    pub messages: usize,
}

// ---------------------------------------------------------------------------
// Canned content
// ---------------------------------------------------------------------------

const DEMO_USERS: &[(&str, &str, &str, &[&str])] = &[
    (
        "amara",
        "Amara Okafor",
        "Street photographer chasing the golden hour.",
        &["photography", "travel", "art"],
    ),
    (
        "ben",
        "Ben Carter",
        "Weekend trail runner and coffee nerd.",
        &["fitness", "food", "nature"],
    ),
    (
        "chloe",
        "Chloe Dubois",
        "Indie game dev by night.",
        &["gaming", "technology", "music"],
    ),
    (
        "diego",
        "Diego Alvarez",
        "Home cook working through every taco recipe there is.",
        &["food", "travel", "sports"],
    ),
    (
        "elif",
        "Elif Demir",
        "Bookworm with a sci-fi problem.",
        &["books", "movies", "science"],
    ),
    (
        "finn",
        "Finn Murphy",
        "Builds furniture out of reclaimed wood.",
        &["diy", "nature", "art"],
    ),
    (
        "grace",
        "Grace Liu",
        "Synth collector and bedroom producer.",
        &["music", "technology", "fashion"],
    ),
    (
        "hugo",
        "Hugo Keller",
        "Climbs rocks, photographs mountains.",
        &["sports", "photography", "travel"],
    ),
];

const DEMO_COMMUNITIES: &[(&str, &str, CommunityCategory)] = &[
    (
        "Rust Builders",
        "Systems programming, embedded hacks and web backends.",
        CommunityCategory::Technology,
    ),
    (
        "Street Frames",
        "Candid photography from cities around the world.",
        CommunityCategory::Photography,
    ),
    (
        "Trail Runners",
        "Routes, races and recovery talk.",
        CommunityCategory::Fitness,
    ),
    (
        "Indie Game Dev",
        "Devlogs, jams and engine arguments.",
        CommunityCategory::Gaming,
    ),
    (
        "Weeknight Cooking",
        "Recipes that survive a Tuesday.",
        CommunityCategory::Food,
    ),
    (
        "Sci-Fi Book Club",
        "One novel a month, spoilers flagged.",
        CommunityCategory::Books,
    ),
    (
        "Synth Heads",
        "Patches, racks and modular madness.",
        CommunityCategory::Music,
    ),
    (
        "Sawdust Club",
        "Joinery, finishes and shop tours.",
        CommunityCategory::Diy,
    ),
    (
        "Alpine Days",
        "Beta, gear and trip reports from the mountains.",
        CommunityCategory::Sports,
    ),
    (
        "Weekend Travelers",
        "Short trips, long memories.",
        CommunityCategory::Travel,
    ),
];

const POST_LINES: &[&str] = &[
    "Finally got this working after a week of evenings. Happy to share notes.",
    "Anyone else going to the meetup on Thursday?",
    "Small win today. It's the small wins that keep me going.",
    "Long write-up incoming, but the short version: it worked.",
    "Picked this up second hand for almost nothing. Best decision this month.",
    "Rainy weekend project, done before the rain stopped.",
    "I keep coming back to the basics. They hold up.",
    "Took a wrong turn and found something better than what I was looking for.",
    "Three attempts, one success. Posting the success.",
    "If you're on the fence about trying this, consider this your sign.",
    "Today did not go as planned. Posting it anyway.",
    "Six months of practice in one picture.",
];

const COMMENT_LINES: &[&str] = &[
    "Love this.",
    "Saving this for the weekend, thanks for sharing.",
    "How long did it take you?",
    "This is exactly what I needed to see today.",
    "Strong agree with the basics point.",
    "Where was this taken?",
    "Following for the write-up.",
    "Same thing happened to me last month.",
    "Great result. What would you do differently?",
    "Okay, you convinced me.",
];

const LINK_POOL: &[(&str, &str, &str)] = &[
    (
        "https://example.com/field-notes",
        "Field notes from a year of practice",
        "What stuck, what didn't, and what I'd tell a beginner.",
    ),
    (
        "https://example.com/gear-guide",
        "The only gear guide you need",
        "Opinionated, short, and cheap-first.",
    ),
    (
        "https://example.com/long-weekend",
        "A long weekend, well spent",
        "48 hours, one small town, no plans.",
    ),
];

const CHAT_SCRIPTS: &[[&str; 3]] = &[
    [
        "Hey, are you going to the meetup on Thursday?",
        "Planning on it. Want to grab food before?",
        "Yes! The ramen place at six?",
    ],
    [
        "Did you see the post in Rust Builders?",
        "The embedded one? Reading it now.",
        "That trick with the feature flags is going straight into my project.",
    ],
    [
        "Book club pick arrived today.",
        "Mine too. No spoilers, but chapter one is strong.",
        "Say no more, starting tonight.",
    ],
    [
        "Weather looks perfect for Saturday.",
        "I'm in. Early start?",
        "Six sharp. Bring the good rope.",
    ],
    [
        "Your last photo set was great.",
        "Thanks! All shot in one evening, believe it or not.",
        "Unreal. Walk me through your settings sometime?",
    ],
];

const CHAT_PAIRS: &[(usize, usize)] = &[(0, 1), (2, 3), (4, 5), (6, 7), (0, 2)];

// ---------------------------------------------------------------------------
// Generator
// ---------------------------------------------------------------------------

/// Populate an empty store with demo data.
///
/// Skips entirely (returning zeroed [`SeedStats`]) when any user already
/// exists, so it is safe to call on every startup.
pub fn populate_demo_data(db: &Database) -> Result<SeedStats, StoreError> {
    if !db.list_users()?.is_empty() {
        info!("store already has users, skipping demo seed");
        return Ok(SeedStats::default());
    }

    info!("populating demo data");
    let mut rng = rand::thread_rng();
    let mut stats = SeedStats::default();

    let users = seed_users(db, &mut stats)?;
    let communities = seed_communities(db, &users, &mut stats)?;
    seed_memberships(db, &users, &communities, &mut rng, &mut stats)?;
    seed_posts(db, &users, &communities, &mut rng, &mut stats)?;
    seed_conversations(db, &users, &mut rng, &mut stats)?;

    info!(?stats, "demo data ready");
    Ok(stats)
}

fn seed_users(db: &Database, stats: &mut SeedStats) -> Result<Vec<User>, StoreError> {
    let mut users = Vec::with_capacity(DEMO_USERS.len());

    for (username, display_name, bio, interests) in DEMO_USERS {
        let mut user = User::new(username, display_name);
        user.email = format!("{username}@example.com");
        user.avatar_url = Some(format!("https://i.pravatar.cc/150?u={username}"));
        user.bio = Some(bio.to_string());
        user.interests = interests.iter().map(|i| i.to_string()).collect();
        // Spread sign-up dates over the past year.
        user.created_at = Utc::now() - Duration::days(30 + 40 * users.len() as i64);

        users.push(db.create_user(&user)?);
        stats.users += 1;
    }

    debug!(count = users.len(), "seeded users");
    Ok(users)
}

fn seed_communities(
    db: &Database,
    users: &[User],
    stats: &mut SeedStats,
) -> Result<Vec<Community>, StoreError> {
    let mut communities = Vec::with_capacity(DEMO_COMMUNITIES.len());

    for (i, (name, description, category)) in DEMO_COMMUNITIES.iter().enumerate() {
        let creator = &users[i % users.len()];
        let mut community = Community::new(name, description, *category, creator.id);
        community.image_url = Some(format!(
            "https://picsum.photos/seed/{}/600/300",
            name.to_lowercase().replace(' ', "-")
        ));
        community.created_at = Utc::now() - Duration::days(20 + 15 * i as i64);

        communities.push(db.create_community(&community)?);
        stats.communities += 1;
    }

    debug!(count = communities.len(), "seeded communities");
    Ok(communities)
}

fn seed_memberships(
    db: &Database,
    users: &[User],
    communities: &[Community],
    rng: &mut impl Rng,
    stats: &mut SeedStats,
) -> Result<(), StoreError> {
    for user in users {
        for community in communities {
            let label = community.category.as_str().to_lowercase();
            let interested = user.interests.iter().any(|i| *i == label);
            if interested || rng.gen_bool(0.25) {
                // Creators are already members; join_community is a no-op then.
                if db.join_community(community.id, user.id)? {
                    stats.memberships += 1;
                }
            }
        }
    }

    debug!(count = stats.memberships, "seeded memberships");
    Ok(())
}

fn seed_posts(
    db: &Database,
    users: &[User],
    communities: &[Community],
    rng: &mut impl Rng,
    stats: &mut SeedStats,
) -> Result<(), StoreError> {
    for community in communities {
        let members = db.list_members(community.id)?;

        for _ in 0..rng.gen_range(3..=8) {
            let author = match members.choose(rng) {
                Some(user) => user,
                None => continue,
            };

            let mut post = Post::new(
                community.id,
                author.id,
                POST_LINES[rng.gen_range(0..POST_LINES.len())],
            );
            post.created_at = Utc::now() - Duration::minutes(rng.gen_range(10..=10_080));

            if rng.gen_bool(0.3) {
                post.image_urls = vec![format!(
                    "https://picsum.photos/seed/{}/800/600",
                    rng.gen_range(1..10_000)
                )];
            }
            if rng.gen_bool(0.15) {
                let (url, title, description) = LINK_POOL[rng.gen_range(0..LINK_POOL.len())];
                post.link_url = Some(url.to_string());
                post.link_preview_title = Some(title.to_string());
                post.link_preview_description = Some(description.to_string());
            }

            let post = db.create_post(&post)?;
            stats.posts += 1;

            for _ in 0..rng.gen_range(0..=5) {
                let commenter = match members.choose(rng) {
                    Some(user) => user,
                    None => continue,
                };
                let mut comment = Comment::new(
                    post.id,
                    commenter.id,
                    COMMENT_LINES[rng.gen_range(0..COMMENT_LINES.len())],
                );
                comment.created_at = post.created_at + Duration::minutes(rng.gen_range(1..=9));

                db.create_comment(&comment)?;
                stats.comments += 1;
            }

            for _ in 0..rng.gen_range(0..=15) {
                let fan = &users[rng.gen_range(0..users.len())];
                db.like_post(post.id, fan.id)?;
                stats.likes += 1;
            }
        }
    }

    debug!(
        posts = stats.posts,
        comments = stats.comments,
        likes = stats.likes,
        "seeded feed content"
    );
    Ok(())
}

fn seed_conversations(
    db: &Database,
    users: &[User],
    rng: &mut impl Rng,
    stats: &mut SeedStats,
) -> Result<(), StoreError> {
    for (i, (a_idx, b_idx)) in CHAT_PAIRS.iter().enumerate() {
        let a = &users[*a_idx];
        let b = &users[*b_idx];
        let script = &CHAT_SCRIPTS[i % CHAT_SCRIPTS.len()];

        let conversation = db.find_or_create_conversation(&[a.id, b.id])?;
        stats.conversations += 1;

        let base = rng.gen_range(30..=4_320);
        let turns = [(a, script[0], base), (b, script[1], base - 5), (a, script[2], base - 9)];

        for (sender, line, minutes_ago) in turns {
            let mut message = Message::new(conversation.id, sender.id, line);
            message.sent_at = Utc::now() - Duration::minutes(minutes_ago);
            db.send_message(&message)?;
            stats.messages += 1;
        }

        // The opener has read the reply; their own last message stays unread
        // so the other side gets a badge.
        db.mark_conversation_read(conversation.id, a.id)?;
    }

    debug!(
        conversations = stats.conversations,
        messages = stats.messages,
        "seeded conversations"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn seed_fills_an_empty_store() {
        let db = Database::open_in_memory().expect("should open");

        let stats = populate_demo_data(&db).expect("should seed");
        assert_eq!(stats.users, DEMO_USERS.len());
        assert_eq!(stats.communities, DEMO_COMMUNITIES.len());
        assert_eq!(stats.conversations, CHAT_PAIRS.len());
        assert_eq!(stats.messages, CHAT_PAIRS.len() * 3);
        assert!(stats.posts >= 3 * DEMO_COMMUNITIES.len());
    }

    #[test]
    fn seed_skips_a_populated_store() {
        let db = Database::open_in_memory().expect("should open");
        db.create_user(&User::new("existing", "Existing"))
            .expect("should create");

        let stats = populate_demo_data(&db).expect("should no-op");
        assert_eq!(stats, SeedStats::default());
        assert_eq!(db.list_users().expect("should list").len(), 1);
    }

    #[test]
    fn seeded_member_counts_match_membership_rows() {
        let db = Database::open_in_memory().expect("should open");
        populate_demo_data(&db).expect("should seed");

        for community in db.list_communities().expect("should list") {
            let members = db.list_members(community.id).expect("should list members");
            assert_eq!(
                community.member_count,
                members.len() as i64,
                "count drift in {}",
                community.name
            );
        }
    }

    #[test]
    fn seeded_conversations_have_full_scripts_with_an_unread_tail() {
        let db = Database::open_in_memory().expect("should open");
        populate_demo_data(&db).expect("should seed");

        let mut conversation_ids = BTreeSet::new();
        for user in db.list_users().expect("should list") {
            for conversation in db
                .list_conversations_for_user(user.id)
                .expect("should list conversations")
            {
                conversation_ids.insert(conversation.id);
            }
        }
        assert_eq!(conversation_ids.len(), CHAT_PAIRS.len());

        for id in conversation_ids {
            let messages = db.list_messages(id).expect("should list messages");
            assert_eq!(messages.len(), 3);
            let last = messages.last().expect("nonempty");
            assert!(!last.is_read, "final message should await the recipient");
        }
    }

    #[test]
    fn seeded_users_have_home_feeds() {
        let db = Database::open_in_memory().expect("should open");
        populate_demo_data(&db).expect("should seed");

        // Every demo user holds at least their interest-driven memberships,
        // and every community has posts, so no feed should be empty.
        for user in db.list_users().expect("should list") {
            let feed = db.list_home_feed(user.id).expect("should load feed");
            assert!(!feed.is_empty(), "{} has an empty feed", user.username);
        }
    }
}
