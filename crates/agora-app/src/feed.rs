//! Feed hydration for the UI.
//!
//! The store hands back bare [`Post`] rows; a feed screen also needs the
//! author and the community of every post. [`FeedItem`] bundles the three,
//! and the hydration helpers memoize lookups so a feed of N posts from M
//! authors costs M author fetches, not N.

use std::collections::HashMap;

use serde::Serialize;
use uuid::Uuid;

use agora_store::{Community, Post, User};

use crate::app::App;
use crate::error::Result;

/// One post, ready to render.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedItem {
    pub post: Post,
    pub author: User,
    pub community: Community,
}

impl App {
    /// The signed-in user's home feed: recent posts from their communities,
    /// newest first, hydrated with authors and communities.
    pub fn home_feed(&self) -> Result<Vec<FeedItem>> {
        let user = self.require_user()?;
        let posts = self.db.list_home_feed(user.id)?;
        self.hydrate_posts(posts)
    }

    /// All posts of one community, newest first. Viewing a community does
    /// not require being signed in.
    pub fn community_feed(&self, community_id: Uuid) -> Result<Vec<FeedItem>> {
        let posts = self.db.list_posts_for_community(community_id)?;
        self.hydrate_posts(posts)
    }

    fn hydrate_posts(&self, posts: Vec<Post>) -> Result<Vec<FeedItem>> {
        let mut authors: HashMap<Uuid, User> = HashMap::new();
        let mut communities: HashMap<Uuid, Community> = HashMap::new();
        let mut items = Vec::with_capacity(posts.len());

        for post in posts {
            let author = match authors.get(&post.author_id) {
                Some(user) => user.clone(),
                None => {
                    let user = self.db.get_user(post.author_id)?;
                    authors.insert(post.author_id, user.clone());
                    user
                }
            };

            let community = match communities.get(&post.community_id) {
                Some(community) => community.clone(),
                None => {
                    let community = self.db.get_community(post.community_id)?;
                    communities.insert(post.community_id, community.clone());
                    community
                }
            };

            items.push(FeedItem {
                post,
                author,
                community,
            });
        }

        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use agora_store::CommunityCategory;
    use chrono::Utc;

    fn backdated_post(community: Uuid, author: Uuid, content: &str, minutes_ago: i64) -> Post {
        let mut post = Post::new(community, author, content);
        post.created_at = Utc::now() - chrono::Duration::minutes(minutes_ago);
        post
    }

    #[test]
    fn home_feed_requires_sign_in() {
        let app = App::open_in_memory().expect("should open");
        assert!(matches!(app.home_feed(), Err(AppError::NotSignedIn)));
    }

    #[test]
    fn home_feed_is_empty_for_a_fresh_user() {
        let mut app = App::open_in_memory().expect("should open");
        app.login("newbie").expect("should sign in");

        let feed = app.home_feed().expect("empty feed is not an error");
        assert!(feed.is_empty());
    }

    #[test]
    fn home_feed_hydrates_authors_and_communities() {
        let mut app = App::open_in_memory().expect("should open");
        let ana = app.login("ana").expect("should sign in");

        let bo = app
            .store()
            .create_user(&User::new("bo", "Bo"))
            .expect("should create user");
        let community = app
            .store()
            .create_community(&Community::new(
                "Rust Builders",
                "Systems talk",
                CommunityCategory::Technology,
                ana.id,
            ))
            .expect("should create community");
        app.store()
            .join_community(community.id, bo.id)
            .expect("should join");

        app.store()
            .create_post(&backdated_post(community.id, ana.id, "older", 10))
            .expect("should post");
        app.store()
            .create_post(&backdated_post(community.id, bo.id, "newer", 2))
            .expect("should post");

        let feed = app.home_feed().expect("should load feed");
        assert_eq!(feed.len(), 2);

        assert_eq!(feed[0].post.content, "newer");
        assert_eq!(feed[0].author.username, "bo");
        assert_eq!(feed[0].community.name, "Rust Builders");

        assert_eq!(feed[1].post.content, "older");
        assert_eq!(feed[1].author.username, "ana");
    }

    #[test]
    fn community_feed_works_signed_out() {
        let app = App::open_in_memory().expect("should open");

        let ana = app
            .store()
            .create_user(&User::new("ana", "Ana"))
            .expect("should create user");
        let community = app
            .store()
            .create_community(&Community::new(
                "Trail Runners",
                "Routes and races",
                CommunityCategory::Fitness,
                ana.id,
            ))
            .expect("should create community");
        app.store()
            .create_post(&Post::new(community.id, ana.id, "morning loop"))
            .expect("should post");

        let feed = app
            .community_feed(community.id)
            .expect("should load community feed");
        assert_eq!(feed.len(), 1);
        assert_eq!(feed[0].author.username, "ana");
        assert_eq!(feed[0].community.id, community.id);
    }
}
