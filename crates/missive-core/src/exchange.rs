use tracing::{debug, info, warn};
use uuid::Uuid;

use missive_crypto::keys::{canonical_public_key, normalize_address};
use missive_types::api::{
    ConversationRequest, ConversationsRequest, GetMessagesRequest, MAX_PAGE_LIMIT, SendMessageRequest,
    SendMessageResponse,
};
use missive_types::models::{Conversation, ConversationFilter, Message, MessageType};

use crate::auth::Caller;
use crate::conversation::{conversation_id, is_pair_id};
use crate::error::{Error, Result};
use crate::store::{Page, Store};
use crate::{MAX_MESSAGE_BYTES, Messenger, now_millis, require_text};

const MAX_NAMESPACE_LEN: usize = 128;
const MAX_CONVERSATION_ID_LEN: usize = 128;

impl<S: Store> Messenger<S> {
    /// Store one message and update both participants' views of the thread.
    pub fn send_message(&self, caller: &Caller, req: &SendMessageRequest) -> Result<SendMessageResponse> {
        let sender = caller.require_account(&req.domain)?;
        require_text("namespace", &req.namespace, MAX_NAMESPACE_LEN)?;
        require_text("message", &req.message, MAX_MESSAGE_BYTES)?;

        let recipient = normalize_address(&req.recipient)?;
        if recipient == sender.address {
            return Err(Error::Invalid("cannot message yourself".into()));
        }

        let recipient_public_key = match req.kind {
            MessageType::Clear => None,
            MessageType::Encrypted => Some(self.recipient_key(&req.domain, &recipient, req)?),
        };

        let canonical = conversation_id(&sender.address, &recipient);
        let conversation_id = match &req.conversation_id {
            // a pair-shaped id may only name the sender's own pair
            Some(id) if is_pair_id(id) => {
                if id.to_ascii_lowercase() != canonical {
                    warn!(
                        "{} sent to {} under another pair's id {}",
                        sender.address, recipient, id
                    );
                    return Err(Error::InvalidConversation);
                }
                canonical
            }
            Some(id) => {
                require_text("conversationID", id, MAX_CONVERSATION_ID_LEN)?;
                id.clone()
            }
            None => canonical,
        };

        let now = now_millis();
        let message = Message {
            id: Uuid::new_v4().to_string(),
            domain: req.domain.clone(),
            namespace: req.namespace.clone(),
            conversation_id,
            sender: sender.address.clone(),
            sender_public_key: sender.public_key.clone(),
            recipient,
            recipient_public_key,
            timestamp: req.timestamp.unwrap_or(now),
            message: req.message.clone(),
            kind: req.kind,
            signature: caller.signature.clone().unwrap_or_default(),
        };

        if !self.store.record_send(&message, now)? {
            warn!(
                "{} tried to reuse conversation {} on {}/{}",
                message.sender, message.conversation_id, message.domain, message.namespace
            );
            return Err(Error::InvalidConversation);
        }

        info!(
            "Stored {} message {} in {} ({} -> {})",
            message.kind, message.id, message.conversation_id, message.sender, message.recipient
        );

        Ok(SendMessageResponse {
            id: message.id,
            conversation_id: message.conversation_id,
            timestamp: message.timestamp,
        })
    }

    /// Encrypted sends must name the recipient's key; if the recipient is
    /// registered on the domain it has to be the registered one.
    fn recipient_key(&self, domain: &str, recipient: &str, req: &SendMessageRequest) -> Result<String> {
        let supplied = req
            .recipient_public_key
            .as_deref()
            .ok_or_else(|| Error::Invalid("encrypted messages need recipientPublicKey".into()))?;
        let key = canonical_public_key(supplied)?;

        if let Some(registered) = self.store.domain_user(domain, recipient)? {
            if registered.public_key != key {
                return Err(Error::Invalid("recipientPublicKey does not match registration".into()));
            }
        }
        Ok(key)
    }

    /// Newest first, one page at a time. Only participants may read a thread.
    pub fn get_messages(&self, caller: &Caller, req: &GetMessagesRequest) -> Result<Vec<Message>> {
        let account = caller.require_account(&req.domain)?;

        if self
            .store
            .conversation(&req.domain, &req.namespace, &account.address, &req.conversation_id)?
            .is_none()
        {
            return Err(Error::NotParticipant);
        }

        if req.before_id.is_some() && req.before.is_none() {
            return Err(Error::Invalid("beforeID needs before".into()));
        }
        let page = Page {
            limit: req.limit.clamp(1, MAX_PAGE_LIMIT),
            before: req.before,
            before_id: req.before_id.clone(),
        };
        let messages = self
            .store
            .messages(&req.domain, &req.namespace, &req.conversation_id, page)?;
        debug!("Listed {} messages from {}", messages.len(), req.conversation_id);
        Ok(messages)
    }

    pub fn get_conversations(&self, caller: &Caller, req: &ConversationsRequest) -> Result<Vec<Conversation>> {
        self.list_conversations(caller, req, ConversationFilter::All)
    }

    pub fn get_accepted_conversations(&self, caller: &Caller, req: &ConversationsRequest) -> Result<Vec<Conversation>> {
        self.list_conversations(caller, req, ConversationFilter::Accepted)
    }

    pub fn get_unaccepted_conversations(
        &self,
        caller: &Caller,
        req: &ConversationsRequest,
    ) -> Result<Vec<Conversation>> {
        self.list_conversations(caller, req, ConversationFilter::Unaccepted)
    }

    fn list_conversations(
        &self,
        caller: &Caller,
        req: &ConversationsRequest,
        filter: ConversationFilter,
    ) -> Result<Vec<Conversation>> {
        let account = caller.require_account(&req.domain)?;
        Ok(self
            .store
            .conversations(&req.domain, &req.namespace, &account.address, filter)?)
    }

    /// Returns false if the caller has no such conversation.
    pub fn accept_conversation(&self, caller: &Caller, req: &ConversationRequest) -> Result<bool> {
        let account = caller.require_account(&req.domain)?;
        Ok(self
            .store
            .accept_conversation(&req.domain, &req.namespace, &account.address, &req.conversation_id)?)
    }

    /// Returns false if the caller has no such conversation.
    pub fn mark_as_read(&self, caller: &Caller, req: &ConversationRequest) -> Result<bool> {
        let account = caller.require_account(&req.domain)?;
        Ok(self
            .store
            .mark_as_read(&req.domain, &req.namespace, &account.address, &req.conversation_id)?)
    }
}
