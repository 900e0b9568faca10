use crate::error::ApiError;
use crate::infra::{RepoError, ShortLinkStore, UniqueKey};
use crate::models::{RecipeId, ShortLink};
use rand::Rng;
use tracing::{debug, error, info, warn};

const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

pub const CODE_LENGTH: usize = 3;
/// 62^3 distinct codes.
pub const KEYSPACE: u64 = (ALPHABET.len() as u64).pow(CODE_LENGTH as u32);
pub const MAX_ATTEMPTS: u32 = 10;
const SATURATION_PERCENT: u64 = 80;

pub fn random_code<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..CODE_LENGTH)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}

pub fn is_valid_code(code: &str) -> bool {
    code.len() == CODE_LENGTH && code.bytes().all(|b| ALPHABET.contains(&b))
}

/// More than `SATURATION_PERCENT` of the keyspace is already issued.
pub fn is_saturated(issued: u64) -> bool {
    issued * 100 > KEYSPACE * SATURATION_PERCENT
}

pub fn short_url(base: &str, code: &str) -> String {
    format!("{}/s/{}", base.trim_end_matches('/'), code)
}

/// Hands out one stable short code per recipe.
///
/// Uniqueness is enforced by the store on insert; the lookup before each
/// insert only saves a round trip on an obvious collision.
pub struct ShortCodeAllocator<'a, S: ShortLinkStore + ?Sized> {
    store: &'a S,
    max_attempts: u32,
}

impl<'a, S: ShortLinkStore + ?Sized> ShortCodeAllocator<'a, S> {
    pub fn new(store: &'a S) -> Self {
        ShortCodeAllocator {
            store,
            max_attempts: MAX_ATTEMPTS,
        }
    }

    #[cfg(test)]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn get_or_create<R: Rng + ?Sized>(
        &self,
        recipe_id: RecipeId,
        rng: &mut R,
    ) -> Result<ShortLink, ApiError> {
        if !self.store.recipe_exists(recipe_id)? {
            return Err(ApiError::NotFound(format!("recipe {}", recipe_id)));
        }
        if let Some(link) = self.store.short_link_for_recipe(recipe_id)? {
            return Ok(link);
        }
        self.check_saturation()?;

        for attempt in 1..=self.max_attempts {
            let code = random_code(rng);
            if self.store.short_link_by_code(&code)?.is_some() {
                debug!(recipe_id, %code, attempt, "short code already taken");
                continue;
            }
            let link = ShortLink { recipe_id, code };
            match self.store.insert_short_link(&link) {
                Ok(()) => {
                    info!(recipe_id, code = %link.code, attempt, "issued short link");
                    return Ok(link);
                }
                Err(RepoError::Duplicate(UniqueKey::ShortLinkCode)) => {
                    debug!(recipe_id, code = %link.code, attempt, "short code taken concurrently");
                }
                Err(RepoError::Duplicate(UniqueKey::ShortLinkRecipe)) => {
                    // Another request linked this recipe first.
                    return self
                        .store
                        .short_link_for_recipe(recipe_id)?
                        .ok_or_else(|| ApiError::NotFound(format!("recipe {}", recipe_id)));
                }
                Err(e) => return Err(e.into()),
            }
        }

        error!(
            recipe_id,
            attempts = self.max_attempts,
            "could not find a free short code"
        );
        Err(ApiError::ResourceExhausted {
            attempts: self.max_attempts,
        })
    }

    pub fn resolve(&self, code: &str) -> Result<RecipeId, ApiError> {
        if !is_valid_code(code) {
            return Err(ApiError::NotFound(format!("short link {}", code)));
        }
        match self.store.short_link_by_code(code)? {
            Some(link) => Ok(link.recipe_id),
            None => Err(ApiError::NotFound(format!("short link {}", code))),
        }
    }

    fn check_saturation(&self) -> Result<(), RepoError> {
        let issued = self.store.count_short_links()?;
        if is_saturated(issued) {
            warn!(
                issued,
                keyspace = KEYSPACE,
                "short code keyspace above {}% allocated, code length should grow",
                SATURATION_PERCENT
            );
        }
        Ok(())
    }
}
