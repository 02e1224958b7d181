use tracing::{info, warn};

use missive_crypto::keys::{normalize_address, public_key_hex};
use missive_crypto::signature::{authenticate_header, recover_personal_signer};
use missive_types::api::{GetDomainUserRequest, RegisterRequest, RegisterResponse};
use missive_types::models::{Account, CompleteUser, DomainUser};

use crate::error::{Error, Result};
use crate::store::{NewRegistration, Registered, Store};
use crate::{Messenger, now_millis, require_text};

const MAX_DOMAIN_LEN: usize = 253;
const MAX_USERNAME_LEN: usize = 64;

/// Who sent a request. Anonymous callers have neither field; a caller whose
/// key is not registered yet has only `public_key`.
#[derive(Debug, Clone, Default)]
pub struct Caller {
    /// Canonical compressed hex.
    pub public_key: Option<String>,
    pub registration: Option<DomainUser>,
    /// Raw `SIGNATURE` header, kept with sent messages.
    pub signature: Option<String>,
}

impl Caller {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn require_public_key(&self) -> Result<&str> {
        self.public_key.as_deref().ok_or(Error::Unauthenticated)
    }

    /// The caller's registration, which must be on `domain`.
    pub fn require_account(&self, domain: &str) -> Result<&DomainUser> {
        let registration = self.registration.as_ref().ok_or(Error::Unauthenticated)?;
        if registration.domain != domain {
            return Err(Error::DomainMismatch {
                registered: registration.domain.clone(),
                requested: domain.to_string(),
            });
        }
        Ok(registration)
    }
}

/// The message an account signs to bind `public_key` to itself.
pub fn authorization_message(address: &str, public_key: &str) -> String {
    format!(
        "I authorize the public key {} to send and receive messages on behalf of {}",
        public_key, address
    )
}

impl<S: Store> Messenger<S> {
    /// Resolve a raw request body and its optional `SIGNATURE` header.
    pub fn authenticate(&self, raw_body: &[u8], signature: Option<&str>) -> Result<Caller> {
        let Some(header) = signature else {
            return Ok(Caller::anonymous());
        };

        let key = authenticate_header(self.policy, raw_body, header).map_err(|e| {
            warn!("Rejected request signature: {}", e);
            Error::InvalidSignature
        })?;
        let public_key = public_key_hex(&key);
        let registration = self.store.domain_user_by_public_key(&public_key)?;

        Ok(Caller {
            public_key: Some(public_key),
            registration,
            signature: Some(header.to_string()),
        })
    }

    /// Bind the caller's public key to `req.address` on `req.domain`.
    pub fn register(&self, caller: &Caller, req: &RegisterRequest) -> Result<RegisterResponse> {
        let public_key = caller.require_public_key()?;
        let address = normalize_address(&req.address)?;
        require_text("domain", &req.domain, MAX_DOMAIN_LEN)?;
        let username = optional_text("username", req.username.as_deref(), MAX_USERNAME_LEN)?;
        let name = optional_text("name", req.name.as_deref(), MAX_USERNAME_LEN)?;

        let signer = recover_personal_signer(&authorization_message(&address, public_key), &req.signature)?;
        if signer != address {
            warn!("Registration for {} signed by {}", address, signer);
            return Err(Error::AddressMismatch);
        }

        let now = now_millis();
        let outcome = self.store.register(&NewRegistration {
            address: &address,
            name,
            domain: &req.domain,
            username,
            public_key,
            signature: &req.signature,
            now,
        })?;

        match outcome {
            Registered::KeyTaken => Err(Error::PublicKeyInUse),
            Registered::Bound(stored) => {
                let key_bound = stored.public_key == public_key;
                if key_bound {
                    info!("Registered {} on {}", address, req.domain);
                } else {
                    // TODO: key rotation needs its own migration flow; until then the first key stays bound.
                    warn!(
                        "{} re-registered on {} with a new key; keeping the original",
                        address, req.domain
                    );
                }
                Ok(RegisterResponse {
                    timestamp: now,
                    public_key: stored.public_key,
                    key_bound,
                })
            }
        }
    }

    pub fn get_user(&self, address: &str) -> Result<Option<Account>> {
        let address = normalize_address(address)?;
        Ok(self.store.account(&address)?)
    }

    pub fn get_domain_user(&self, req: &GetDomainUserRequest) -> Result<Option<DomainUser>> {
        match (&req.address, &req.username) {
            (Some(address), _) => {
                let address = normalize_address(address)?;
                Ok(self.store.domain_user(&req.domain, &address)?)
            }
            (None, Some(username)) => Ok(self.store.domain_user_by_username(&req.domain, username)?),
            (None, None) => Err(Error::Invalid("address or username required".into())),
        }
    }

    pub fn get_complete_user(&self, address: &str) -> Result<Option<CompleteUser>> {
        let address = normalize_address(address)?;
        let Some(account) = self.store.account(&address)? else {
            return Ok(None);
        };
        let domains = self.store.domain_users_for(&address)?;
        Ok(Some(CompleteUser { account, domains }))
    }
}

fn optional_text<'a>(field: &str, value: Option<&'a str>, max: usize) -> Result<Option<&'a str>> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => {
            require_text(field, v, max)?;
            Ok(Some(v))
        }
    }
}
