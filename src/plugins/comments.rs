//! Append-only comment threads embedded in a proposal.
//!
//! Comments are never edited or removed. The only mutation after creation is
//! the moderation flag `resolved`, which no workflow transition touches.

use crate::core::error::CharterError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use ulid::Ulid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommentKind {
    Suggestion,
    Concern,
    Support,
    Question,
}

impl FromStr for CommentKind {
    type Err = CharterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "suggestion" => Ok(CommentKind::Suggestion),
            "concern" => Ok(CommentKind::Concern),
            "support" => Ok(CommentKind::Support),
            "question" => Ok(CommentKind::Question),
            other => Err(CharterError::ValidationError(format!(
                "Unknown comment type '{}'. Valid: suggestion, concern, support, question",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub author: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: CommentKind,
    pub resolved: bool,
    pub replies: Vec<Comment>,
}

/// What a caller supplies; id, timestamp and `resolved` are assigned here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewComment {
    pub author: String,
    pub content: String,
    pub kind: CommentKind,
}

impl NewComment {
    pub fn new(author: &str, content: &str, kind: CommentKind) -> Self {
        Self {
            author: author.to_string(),
            content: content.to_string(),
            kind,
        }
    }
}

impl Comment {
    pub fn create(input: NewComment, at: DateTime<Utc>) -> Result<Self, CharterError> {
        if input.author.trim().is_empty() {
            return Err(CharterError::ValidationError(
                "Comment author must not be empty".to_string(),
            ));
        }
        if input.content.trim().is_empty() {
            return Err(CharterError::ValidationError(
                "Comment content must not be empty".to_string(),
            ));
        }
        Ok(Self {
            id: format!("CM_{}", Ulid::new()),
            author: input.author,
            content: input.content,
            timestamp: at,
            kind: input.kind,
            resolved: false,
            replies: Vec::new(),
        })
    }

    fn is_open_concern(&self) -> bool {
        self.kind == CommentKind::Concern && !self.resolved
    }
}

pub fn find<'a>(thread: &'a [Comment], comment_id: &str) -> Option<&'a Comment> {
    for comment in thread {
        if comment.id == comment_id {
            return Some(comment);
        }
        if let Some(found) = find(&comment.replies, comment_id) {
            return Some(found);
        }
    }
    None
}

fn find_mut<'a>(thread: &'a mut [Comment], comment_id: &str) -> Option<&'a mut Comment> {
    for comment in thread.iter_mut() {
        if comment.id == comment_id {
            return Some(comment);
        }
        if let Some(found) = find_mut(&mut comment.replies, comment_id) {
            return Some(found);
        }
    }
    None
}

pub fn append(thread: &mut Vec<Comment>, comment: Comment) {
    thread.push(comment);
}

/// Attach `reply` under `parent_id`, at any depth.
pub fn reply(thread: &mut [Comment], parent_id: &str, reply: Comment) -> Result<(), CharterError> {
    let parent = find_mut(thread, parent_id).ok_or_else(|| {
        CharterError::ValidationError(format!("Comment '{}' not found", parent_id))
    })?;
    parent.replies.push(reply);
    Ok(())
}

/// Moderation: mark a comment resolved. Returns false if it already was.
pub fn resolve(thread: &mut [Comment], comment_id: &str) -> Result<bool, CharterError> {
    let comment = find_mut(thread, comment_id).ok_or_else(|| {
        CharterError::ValidationError(format!("Comment '{}' not found", comment_id))
    })?;
    let changed = !comment.resolved;
    comment.resolved = true;
    Ok(changed)
}

/// Unresolved `concern` comments anywhere in the thread, depth-first.
pub fn unresolved_concerns(thread: &[Comment]) -> Vec<&Comment> {
    let mut out = Vec::new();
    collect_open_concerns(thread, &mut out);
    out
}

fn collect_open_concerns<'a>(thread: &'a [Comment], out: &mut Vec<&'a Comment>) {
    for comment in thread {
        if comment.is_open_concern() {
            out.push(comment);
        }
        collect_open_concerns(&comment.replies, out);
    }
}

pub fn count(thread: &[Comment]) -> usize {
    thread.iter().map(|c| 1 + count(&c.replies)).sum()
}
