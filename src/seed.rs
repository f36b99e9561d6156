use crate::auth::password::hash_password;
use crate::db::models::{AuthorSnapshot, ContentKind, NewPost, NewUser, PostChanges, User};
use crate::store::{PostStore, UserStore};

/// Every sample account logs in with this password.
pub const SAMPLE_PASSWORD: &str = "password123";

struct SampleUser {
    username: &'static str,
    email: &'static str,
    display_name: &'static str,
    avatar_url: &'static str,
}

struct SamplePost {
    author: usize,
    kind: ContentKind,
    content: &'static str,
    caption: &'static str,
    counters: (i64, i64, i64),
    tags: &'static [&'static str],
    location: &'static str,
}

const USERS: &[SampleUser] = &[
    SampleUser {
        username: "alex_wanderer",
        email: "alex@wanderlust.com",
        display_name: "Alex Wanderer",
        avatar_url: "https://images.unsplash.com/photo-1507003211169-0a1dd7228f2d?w=200&h=200&fit=crop",
    },
    SampleUser {
        username: "maya_photographer",
        email: "maya@pixel.com",
        display_name: "Maya Photographer",
        avatar_url: "https://images.unsplash.com/photo-1494790108377-be9c29b29330?w=200&h=200&fit=crop",
    },
    SampleUser {
        username: "james_creator",
        email: "james@creative.com",
        display_name: "James Creator",
        avatar_url: "https://images.unsplash.com/photo-1472099645785-5658abf4ff4e?w=200&h=200&fit=crop",
    },
    SampleUser {
        username: "sarah_vlogger",
        email: "sarah@stories.com",
        display_name: "Sarah Vlogger",
        avatar_url: "https://images.unsplash.com/photo-1438761681033-6461ffad8d80?w=200&h=200&fit=crop",
    },
    SampleUser {
        username: "david_writer",
        email: "david@words.com",
        display_name: "David Writer",
        avatar_url: "https://images.unsplash.com/photo-1500648767791-00dcc994a43e?w=200&h=200&fit=crop",
    },
];

const POSTS: &[SamplePost] = &[
    SamplePost {
        author: 0,
        kind: ContentKind::Photo,
        content: "https://images.unsplash.com/photo-1464822759023-fed622ff2c3b?w=600&h=600&fit=crop",
        caption: "Mountain sunrise at dawn 🏔️ The perfect way to start the day.",
        counters: (1247, 89, 34),
        tags: &["nature", "photography", "mountains", "sunrise"],
        location: "Swiss Alps",
    },
    SamplePost {
        author: 1,
        kind: ContentKind::Photo,
        content: "https://images.unsplash.com/photo-1540959733332-eab4deabeeaf?w=600&h=600&fit=crop",
        caption: "Urban exploration in Tokyo 🌃 Every corner tells a story.",
        counters: (892, 67, 23),
        tags: &["urban", "photography", "tokyo", "architecture"],
        location: "Tokyo, Japan",
    },
    SamplePost {
        author: 3,
        kind: ContentKind::Video,
        content: "https://storage.googleapis.com/gtv-videos-bucket/sample/ForBiggerJoyrides.mp4",
        caption: "Road trip diaries: three countries in one weekend. Travel hacks inside!",
        counters: (2310, 198, 120),
        tags: &["travel", "vlog", "roadtrip"],
        location: "Lisbon, Portugal",
    },
    SamplePost {
        author: 2,
        kind: ContentKind::Video,
        content: "https://storage.googleapis.com/gtv-videos-bucket/sample/ForBiggerBlazes.mp4",
        caption: "Behind the scenes of my latest design project. Creative process unlocked.",
        counters: (1543, 76, 45),
        tags: &["design", "creative", "art"],
        location: "",
    },
    SamplePost {
        author: 4,
        kind: ContentKind::Text,
        content: "Writing every morning for a year taught me one thing: consistency beats inspiration. \
                  Show up, even when the page stays blank.",
        caption: "A year of morning pages",
        counters: (534, 87, 21),
        tags: &["writing", "habits", "career"],
        location: "",
    },
    SamplePost {
        author: 2,
        kind: ContentKind::Text,
        content: "Shipped my first startup MVP this week. Coding at 2am is not a strategy, but here we are.",
        caption: "Startup life, tech edition",
        counters: (321, 45, 12),
        tags: &["technology", "startup", "programming"],
        location: "San Francisco, CA",
    },
    SamplePost {
        author: 0,
        kind: ContentKind::Photo,
        content: "https://images.unsplash.com/photo-1531366936337-7c912a4589a7?w=600&h=600&fit=crop",
        caption: "Northern lights magic 🌌 The universe putting on a show!",
        counters: (3421, 234, 156),
        tags: &["aurora", "nature", "photography", "trending"],
        location: "Tromsø, Norway",
    },
    SamplePost {
        author: 4,
        kind: ContentKind::Text,
        content: "Budgeting is a creative act. Every dollar gets a job, and the job can be joy.",
        caption: "Money notes for entrepreneurs",
        counters: (210, 33, 8),
        tags: &["finance", "business", "entrepreneurship"],
        location: "Remote",
    },
];

#[derive(Debug, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub users_created: usize,
    pub posts_created: usize,
}

async fn ensure_user(
    users: &dyn UserStore,
    sample: &SampleUser,
    password_hash: &str,
    summary: &mut SeedSummary,
) -> anyhow::Result<User> {
    if let Some(existing) = users.find_by_email(sample.email).await? {
        return Ok(existing);
    }
    let user = users
        .create(NewUser {
            username: sample.username.to_string(),
            email: sample.email.to_string(),
            password_hash: password_hash.to_string(),
            display_name: sample.display_name.to_string(),
            avatar_url: sample.avatar_url.to_string(),
        })
        .await?;
    summary.users_created += 1;
    Ok(user)
}

/// Insert the sample accounts and, if there are no posts yet, the sample posts.
/// Running it again changes nothing.
pub async fn seed(
    users: &dyn UserStore,
    posts: &dyn PostStore,
    bcrypt_cost: u32,
) -> anyhow::Result<SeedSummary> {
    let mut summary = SeedSummary::default();

    let password_hash =
        tokio::task::spawn_blocking(move || hash_password(SAMPLE_PASSWORD, bcrypt_cost)).await??;

    let mut accounts = Vec::with_capacity(USERS.len());
    for sample in USERS {
        accounts.push(ensure_user(users, sample, &password_hash, &mut summary).await?);
    }

    if posts.count().await? > 0 {
        tracing::info!("Posts already present, skipping sample posts");
        return Ok(summary);
    }

    // Oldest first so the list endpoint shows the last entry on top.
    for sample in POSTS {
        let owner = &accounts[sample.author];
        let tags: Vec<&str> = sample.tags.to_vec();
        let post = posts
            .create(NewPost {
                user_id: owner.id,
                author: AuthorSnapshot::of(owner),
                content_type: sample.kind,
                content: sample.content.to_string(),
                caption: sample.caption.to_string(),
                filter_tags: serde_json::to_string(&tags)?,
                location: sample.location.to_string(),
            })
            .await?;

        let (likes, comments, reposts) = sample.counters;
        posts
            .update(
                post.id,
                PostChanges {
                    likes: Some(likes),
                    comments: Some(comments),
                    reposts: Some(reposts),
                    ..Default::default()
                },
            )
            .await?;
        summary.posts_created += 1;
    }

    tracing::info!(
        users = summary.users_created,
        posts = summary.posts_created,
        "Seeded sample data"
    );
    Ok(summary)
}
