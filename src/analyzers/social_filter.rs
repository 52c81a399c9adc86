// Decides which freshly listed coins are worth an alert.
//
// We are looking for projects nobody has noticed yet, so a coin only passes
// when BOTH its X/Twitter following and its Telegram membership are still
// below the thresholds.

use crate::models::AssetDetail;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SocialFilter {
    /// Exclusive upper bound on X/Twitter followers
    pub max_twitter_followers: u64,
    /// Exclusive upper bound on Telegram channel members
    pub max_telegram_users: u64,
}

impl Default for SocialFilter {
    fn default() -> Self {
        Self {
            max_twitter_followers: 200,
            max_telegram_users: 50,
        }
    }
}

impl SocialFilter {
    pub fn new(max_twitter_followers: u64, max_telegram_users: u64) -> Self {
        Self {
            max_twitter_followers,
            max_telegram_users,
        }
    }

    pub fn matches(&self, detail: &AssetDetail) -> bool {
        detail.twitter_followers < self.max_twitter_followers
            && detail.telegram_users < self.max_telegram_users
    }
}
