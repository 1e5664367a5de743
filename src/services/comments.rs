//! Comment threads: two-level keyset pagination, reply counts and the
//! author-only mutations.
//!
//! Top-level comments of a post are listed newest first and each one carries the
//! number of its direct replies. Replies are listed oldest first and are fetched
//! per parent, so a reply's own replies are one more call away.

use futures::future::try_join_all;

use super::pagination::{probe_limit, split_page};
use crate::{
    error::AppError,
    models::comment::{CommentPage, CommentResponse, NewComment, ThreadComment},
    repository::{CommentRepository, RepositoryError},
};

pub const TOP_LEVEL_PAGE_SIZE: usize = 3;
pub const REPLY_PAGE_SIZE: usize = 2;

/// Newest top-level comments of a post, strictly older than `continue_after_id`.
pub async fn list_top_level_comments(
    repo: &dyn CommentRepository,
    post_id: i64,
    continue_after_id: Option<i64>,
) -> Result<CommentPage<ThreadComment>, AppError> {
    let rows = repo
        .find_top_level(post_id, continue_after_id, probe_limit(TOP_LEVEL_PAGE_SIZE))
        .await?;
    let (rows, end_of_pagination_reached) = split_page(rows, TOP_LEVEL_PAGE_SIZE);

    // One count per comment, all in flight at once; try_join_all keeps page order.
    let comments = try_join_all(rows.into_iter().map(|row| async move {
        let reply_count = repo.count_replies(row.id).await?;
        Ok::<_, RepositoryError>(ThreadComment {
            comment: row.into(),
            reply_count,
        })
    }))
    .await?;

    Ok(CommentPage {
        comments,
        end_of_pagination_reached,
    })
}

/// Oldest replies to a comment, strictly newer than `continue_after_id`.
pub async fn list_replies(
    repo: &dyn CommentRepository,
    parent_comment_id: i64,
    continue_after_id: Option<i64>,
) -> Result<CommentPage<CommentResponse>, AppError> {
    let rows = repo
        .find_replies(parent_comment_id, continue_after_id, probe_limit(REPLY_PAGE_SIZE))
        .await?;
    let (rows, end_of_pagination_reached) = split_page(rows, REPLY_PAGE_SIZE);

    Ok(CommentPage {
        comments: rows.into_iter().map(CommentResponse::from).collect(),
        end_of_pagination_reached,
    })
}

/// Neither the post nor the parent comment is checked for existence.
pub async fn create_comment(
    repo: &dyn CommentRepository,
    post_id: i64,
    author_id: i64,
    text: String,
    parent_comment_id: Option<i64>,
) -> Result<CommentResponse, AppError> {
    let comment = repo
        .insert(NewComment {
            post_id,
            author_id,
            text,
            parent_comment_id,
        })
        .await?;

    tracing::debug!(
        comment_id = comment.id,
        post_id,
        ?parent_comment_id,
        "Comment created"
    );

    expanded(repo, comment.id).await
}

pub async fn update_comment(
    repo: &dyn CommentRepository,
    comment_id: i64,
    new_text: &str,
    requesting_user_id: i64,
) -> Result<CommentResponse, AppError> {
    ensure_author(repo, comment_id, requesting_user_id).await?;

    repo.update_text(comment_id, new_text)
        .await?
        .ok_or_else(comment_not_found)?;

    expanded(repo, comment_id).await
}

/// Deletes a comment and, level by level, every comment below it.
///
/// Each level is a separate store call. A failure part way through leaves the
/// remaining descendants in place with a dangling parent id.
pub async fn delete_comment(
    repo: &dyn CommentRepository,
    comment_id: i64,
    requesting_user_id: i64,
) -> Result<(), AppError> {
    ensure_author(repo, comment_id, requesting_user_id).await?;

    if !repo.delete_by_id(comment_id).await? {
        return Err(comment_not_found());
    }

    let mut frontier = vec![comment_id];
    let mut descendants = 0;
    while !frontier.is_empty() {
        frontier = repo.delete_children_of(&frontier).await?;
        descendants += frontier.len();
    }

    tracing::debug!(comment_id, descendants, "Comment deleted");

    Ok(())
}

async fn ensure_author(
    repo: &dyn CommentRepository,
    comment_id: i64,
    requesting_user_id: i64,
) -> Result<(), AppError> {
    let comment = repo
        .find_by_id(comment_id)
        .await?
        .ok_or_else(comment_not_found)?;

    if comment.author_id != requesting_user_id {
        return Err(AppError::Unauthorized(
            "You are not the author of this comment".to_string(),
        ));
    }

    Ok(())
}

async fn expanded(
    repo: &dyn CommentRepository,
    comment_id: i64,
) -> Result<CommentResponse, AppError> {
    repo.find_row_by_id(comment_id)
        .await?
        .map(CommentResponse::from)
        .ok_or_else(comment_not_found)
}

fn comment_not_found() -> AppError {
    AppError::NotFound("Comment not found".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::user::NewUser,
        repository::{MemoryStore, UserRepository},
    };

    async fn user(store: &MemoryStore, name: &str) -> i64 {
        UserRepository::insert(
            store,
            NewUser {
                username: name.to_string(),
                email: format!("{name}@example.com"),
                password: "hash".to_string(),
            },
        )
        .await
        .unwrap()
        .id
    }

    async fn comment(store: &MemoryStore, post: i64, author: i64, parent: Option<i64>) -> i64 {
        create_comment(store, post, author, "hello".to_string(), parent)
            .await
            .unwrap()
            .id
    }

    fn ids<T>(page: &CommentPage<T>, id: impl Fn(&T) -> i64) -> Vec<i64> {
        page.comments.iter().map(id).collect()
    }

    #[tokio::test]
    async fn top_level_pages_newest_first() {
        let store = MemoryStore::new();
        let alice = user(&store, "alice").await;

        let c1 = comment(&store, 7, alice, None).await;
        let c2 = comment(&store, 7, alice, None).await;
        let c3 = comment(&store, 7, alice, None).await;
        let c4 = comment(&store, 7, alice, None).await;

        let first = list_top_level_comments(&store, 7, None).await.unwrap();
        assert_eq!(ids(&first, |c| c.comment.id), vec![c4, c3, c2]);
        assert!(!first.end_of_pagination_reached);

        let second = list_top_level_comments(&store, 7, Some(c2)).await.unwrap();
        assert_eq!(ids(&second, |c| c.comment.id), vec![c1]);
        assert!(second.end_of_pagination_reached);
    }

    #[tokio::test]
    async fn replies_are_excluded_from_top_level_and_counted() {
        let store = MemoryStore::new();
        let alice = user(&store, "alice").await;

        let parent = comment(&store, 1, alice, None).await;
        let other = comment(&store, 1, alice, None).await;
        for _ in 0..4 {
            comment(&store, 1, alice, Some(parent)).await;
        }
        // A reply on another post still counts toward its parent.
        comment(&store, 2, alice, Some(parent)).await;

        let page = list_top_level_comments(&store, 1, None).await.unwrap();
        assert_eq!(ids(&page, |c| c.comment.id), vec![other, parent]);
        assert_eq!(page.comments[0].reply_count, 0);
        assert_eq!(page.comments[1].reply_count, 5);
        assert!(page.end_of_pagination_reached);
    }

    #[tokio::test]
    async fn following_cursors_visits_every_top_level_comment_once() {
        let store = MemoryStore::new();
        let alice = user(&store, "alice").await;

        let mut expected = Vec::new();
        for i in 0..11 {
            expected.push(comment(&store, 3, alice, None).await);
            if i % 3 == 0 {
                comment(&store, 3, alice, expected.last().copied()).await;
            }
            comment(&store, 4, alice, None).await;
        }
        expected.reverse();

        let mut seen = Vec::new();
        let mut cursor = None;
        loop {
            let page = list_top_level_comments(&store, 3, cursor).await.unwrap();
            let page_ids = ids(&page, |c| c.comment.id);
            assert!(page_ids.len() <= TOP_LEVEL_PAGE_SIZE);
            assert!(page_ids.windows(2).all(|w| w[0] > w[1]));

            // Same cursor, no writes in between: same page.
            let again = list_top_level_comments(&store, 3, cursor).await.unwrap();
            assert_eq!(ids(&again, |c| c.comment.id), page_ids);

            seen.extend_from_slice(&page_ids);
            if page.end_of_pagination_reached {
                break;
            }
            cursor = page_ids.last().copied();
        }

        assert_eq!(seen, expected);
    }

    #[tokio::test]
    async fn replies_page_oldest_first() {
        let store = MemoryStore::new();
        let alice = user(&store, "alice").await;
        let parent = comment(&store, 1, alice, None).await;

        let r1 = comment(&store, 1, alice, Some(parent)).await;
        let r2 = comment(&store, 1, alice, Some(parent)).await;

        let page = list_replies(&store, parent, None).await.unwrap();
        assert_eq!(ids(&page, |c| c.id), vec![r1, r2]);
        assert!(page.end_of_pagination_reached);

        let r3 = comment(&store, 1, alice, Some(parent)).await;
        let page = list_replies(&store, parent, None).await.unwrap();
        assert_eq!(ids(&page, |c| c.id), vec![r1, r2]);
        assert!(!page.end_of_pagination_reached);

        let next = list_replies(&store, parent, Some(r2)).await.unwrap();
        assert_eq!(ids(&next, |c| c.id), vec![r3]);
        assert!(next.end_of_pagination_reached);
    }

    #[tokio::test]
    async fn delete_cascades_through_every_level() {
        let store = MemoryStore::new();
        let alice = user(&store, "alice").await;

        let root = comment(&store, 1, alice, None).await;
        let reply = comment(&store, 1, alice, Some(root)).await;
        let nested = comment(&store, 1, alice, Some(reply)).await;
        let sibling = comment(&store, 1, alice, None).await;

        delete_comment(&store, root, alice).await.unwrap();

        for id in [root, reply, nested] {
            assert!(CommentRepository::find_by_id(&store, id).await.unwrap().is_none());
        }
        assert!(CommentRepository::find_by_id(&store, sibling).await.unwrap().is_some());
        assert!(list_replies(&store, root, None).await.unwrap().comments.is_empty());
    }

    #[tokio::test]
    async fn only_the_author_can_edit_or_delete() {
        let store = MemoryStore::new();
        let alice = user(&store, "alice").await;
        let bob = user(&store, "bob").await;
        let id = comment(&store, 1, alice, None).await;

        let err = update_comment(&store, id, "hijacked", bob).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
        let err = delete_comment(&store, id, bob).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));

        let stored = CommentRepository::find_by_id(&store, id).await.unwrap().unwrap();
        assert_eq!(stored.text, "hello");

        let updated = update_comment(&store, id, "edited", alice).await.unwrap();
        assert_eq!(updated.text, "edited");
        assert_eq!(updated.author.username, "alice");
    }

    #[tokio::test]
    async fn missing_comment_is_not_found() {
        let store = MemoryStore::new();
        let alice = user(&store, "alice").await;

        let err = update_comment(&store, 999, "x", alice).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        let err = delete_comment(&store, 999, alice).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
