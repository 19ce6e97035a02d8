use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use thiserror::Error;

use guildkeeper_core::domain::community::{ChannelId, CommunityId, Member, MessageId, UserId};

use crate::{
    commands::{CommandRouter, CommandService, NoopCommandService, SlashCommandPayload},
    messages::OutgoingMessage,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatEnvelope {
    pub envelope_id: String,
    pub event: ChatEvent,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChatEvent {
    SlashCommand(SlashCommandPayload),
    MessageCreated(MessageCreatedEvent),
    MemberJoined(MemberJoinedEvent),
    ReactionAdded(ReactionEvent),
    ReactionRemoved(ReactionEvent),
    Unsupported { event_type: String },
}

impl ChatEvent {
    pub fn event_type(&self) -> ChatEventType {
        match self {
            Self::SlashCommand(_) => ChatEventType::SlashCommand,
            Self::MessageCreated(_) => ChatEventType::MessageCreated,
            Self::MemberJoined(_) => ChatEventType::MemberJoined,
            Self::ReactionAdded(_) => ChatEventType::ReactionAdded,
            Self::ReactionRemoved(_) => ChatEventType::ReactionRemoved,
            Self::Unsupported { .. } => ChatEventType::Unsupported,
        }
    }

    pub fn community_id(&self) -> Option<&CommunityId> {
        match self {
            Self::SlashCommand(payload) => payload.community_id.as_ref(),
            Self::MessageCreated(event) => event.community_id.as_ref(),
            Self::MemberJoined(event) => Some(&event.community_id),
            Self::ReactionAdded(event) | Self::ReactionRemoved(event) => Some(&event.community_id),
            Self::Unsupported { .. } => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ChatEventType {
    SlashCommand,
    MessageCreated,
    MemberJoined,
    ReactionAdded,
    ReactionRemoved,
    Unsupported,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageCreatedEvent {
    /// `None` for direct messages.
    pub community_id: Option<CommunityId>,
    pub channel_id: ChannelId,
    pub message_id: MessageId,
    pub author: Member,
    pub content: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemberJoinedEvent {
    pub community_id: CommunityId,
    pub member: Member,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReactionEvent {
    pub community_id: CommunityId,
    pub channel_id: ChannelId,
    pub message_id: MessageId,
    pub user_id: UserId,
    pub user_is_bot: bool,
    pub emoji: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventContext {
    pub correlation_id: String,
}

impl Default for EventContext {
    fn default() -> Self {
        Self { correlation_id: "unknown-correlation-id".to_owned() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HandlerResult {
    /// Reply to the interaction that produced the event.
    Responded(OutgoingMessage),
    Processed,
    Ignored,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EventHandlerError {
    #[error("message handler failure: {0}")]
    Message(String),
    #[error("member join handler failure: {0}")]
    MemberJoined(String),
    #[error("reaction handler failure: {0}")]
    Reaction(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error(transparent)]
    Handler(#[from] EventHandlerError),
}

#[async_trait]
pub trait EventHandler: Send + Sync {
    fn event_type(&self) -> ChatEventType;
    async fn handle(
        &self,
        envelope: &ChatEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError>;
}

#[derive(Default)]
pub struct EventDispatcher {
    handlers: HashMap<ChatEventType, Arc<dyn EventHandler>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<H>(&mut self, handler: H)
    where
        H: EventHandler + 'static,
    {
        self.handlers.insert(handler.event_type(), Arc::new(handler));
    }

    pub async fn dispatch(
        &self,
        envelope: &ChatEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, DispatchError> {
        let Some(handler) = self.handlers.get(&envelope.event.event_type()) else {
            return Ok(HandlerResult::Ignored);
        };

        handler.handle(envelope, ctx).await.map_err(DispatchError::from)
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}

/// Commands only; message, join and reaction events are ignored.
pub fn default_dispatcher() -> EventDispatcher {
    let mut dispatcher = EventDispatcher::new();
    dispatcher.register(SlashCommandHandler::new(NoopCommandService));
    dispatcher
}

pub struct SlashCommandHandler<S> {
    router: CommandRouter<S>,
}

impl<S> SlashCommandHandler<S>
where
    S: CommandService,
{
    pub fn new(service: S) -> Self {
        Self { router: CommandRouter::new(service) }
    }
}

#[async_trait]
impl<S> EventHandler for SlashCommandHandler<S>
where
    S: CommandService + 'static,
{
    fn event_type(&self) -> ChatEventType {
        ChatEventType::SlashCommand
    }

    async fn handle(
        &self,
        envelope: &ChatEnvelope,
        _ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let ChatEvent::SlashCommand(payload) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };

        Ok(HandlerResult::Responded(self.router.route(payload).await))
    }
}

#[async_trait]
pub trait MessageService: Send + Sync {
    async fn handle_message(
        &self,
        event: &MessageCreatedEvent,
        ctx: &EventContext,
    ) -> Result<(), EventHandlerError>;
}

pub struct MessageCreatedHandler<S> {
    service: S,
}

impl<S> MessageCreatedHandler<S>
where
    S: MessageService,
{
    pub fn new(service: S) -> Self {
        Self { service }
    }
}

#[async_trait]
impl<S> EventHandler for MessageCreatedHandler<S>
where
    S: MessageService + 'static,
{
    fn event_type(&self) -> ChatEventType {
        ChatEventType::MessageCreated
    }

    async fn handle(
        &self,
        envelope: &ChatEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let ChatEvent::MessageCreated(event) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };
        if event.author.is_bot || event.community_id.is_none() {
            return Ok(HandlerResult::Ignored);
        }

        self.service.handle_message(event, ctx).await?;
        Ok(HandlerResult::Processed)
    }
}

#[async_trait]
pub trait MemberService: Send + Sync {
    async fn member_joined(
        &self,
        event: &MemberJoinedEvent,
        ctx: &EventContext,
    ) -> Result<(), EventHandlerError>;
}

pub struct MemberJoinedHandler<S> {
    service: S,
}

impl<S> MemberJoinedHandler<S>
where
    S: MemberService,
{
    pub fn new(service: S) -> Self {
        Self { service }
    }
}

#[async_trait]
impl<S> EventHandler for MemberJoinedHandler<S>
where
    S: MemberService + 'static,
{
    fn event_type(&self) -> ChatEventType {
        ChatEventType::MemberJoined
    }

    async fn handle(
        &self,
        envelope: &ChatEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let ChatEvent::MemberJoined(event) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };

        self.service.member_joined(event, ctx).await?;
        Ok(HandlerResult::Processed)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReactionChange {
    Added,
    Removed,
}

#[async_trait]
pub trait ReactionService: Send + Sync {
    async fn reaction_changed(
        &self,
        change: ReactionChange,
        event: &ReactionEvent,
        ctx: &EventContext,
    ) -> Result<(), EventHandlerError>;
}

/// One instance per direction; both share the same service.
pub struct ReactionHandler<S: ?Sized> {
    change: ReactionChange,
    service: Arc<S>,
}

impl<S> ReactionHandler<S>
where
    S: ReactionService + ?Sized,
{
    pub fn added(service: Arc<S>) -> Self {
        Self { change: ReactionChange::Added, service }
    }

    pub fn removed(service: Arc<S>) -> Self {
        Self { change: ReactionChange::Removed, service }
    }
}

#[async_trait]
impl<S> EventHandler for ReactionHandler<S>
where
    S: ReactionService + ?Sized + 'static,
{
    fn event_type(&self) -> ChatEventType {
        match self.change {
            ReactionChange::Added => ChatEventType::ReactionAdded,
            ReactionChange::Removed => ChatEventType::ReactionRemoved,
        }
    }

    async fn handle(
        &self,
        envelope: &ChatEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let event = match (&envelope.event, self.change) {
            (ChatEvent::ReactionAdded(event), ReactionChange::Added)
            | (ChatEvent::ReactionRemoved(event), ReactionChange::Removed) => event,
            _ => return Ok(HandlerResult::Ignored),
        };
        if event.user_is_bot {
            return Ok(HandlerResult::Ignored);
        }

        self.service.reaction_changed(self.change, event, ctx).await?;
        Ok(HandlerResult::Processed)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use async_trait::async_trait;
    use tokio::sync::Mutex;

    use guildkeeper_core::domain::community::{ChannelId, CommunityId, Member, MessageId, UserId};

    use super::{
        default_dispatcher, ChatEnvelope, ChatEvent, EventContext, EventDispatcher,
        EventHandlerError, HandlerResult, MessageCreatedEvent, MessageCreatedHandler,
        MessageService, ReactionChange, ReactionEvent, ReactionHandler, ReactionService,
    };
    use crate::commands::SlashCommandPayload;

    fn member(id: &str, is_bot: bool) -> Member {
        Member {
            user_id: UserId(id.to_owned()),
            display_name: id.to_owned(),
            is_bot,
            role_ids: Vec::new(),
            top_role_position: 0,
            avatar_url: None,
            joined_at: None,
        }
    }

    fn message(author: Member, community: Option<&str>) -> ChatEnvelope {
        ChatEnvelope {
            envelope_id: "env-msg".to_owned(),
            event: ChatEvent::MessageCreated(MessageCreatedEvent {
                community_id: community.map(|id| CommunityId(id.to_owned())),
                channel_id: ChannelId("c-1".to_owned()),
                message_id: MessageId("m-1".to_owned()),
                author,
                content: "hello".to_owned(),
            }),
        }
    }

    fn reaction(user_is_bot: bool) -> ReactionEvent {
        ReactionEvent {
            community_id: CommunityId("g-1".to_owned()),
            channel_id: ChannelId("c-1".to_owned()),
            message_id: MessageId("m-1".to_owned()),
            user_id: UserId("u-1".to_owned()),
            user_is_bot,
            emoji: "🎉".to_owned(),
        }
    }

    #[derive(Default)]
    struct CountingMessages {
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl MessageService for Arc<CountingMessages> {
        async fn handle_message(
            &self,
            event: &MessageCreatedEvent,
            _ctx: &EventContext,
        ) -> Result<(), EventHandlerError> {
            self.seen.lock().await.push(event.author.user_id.0.clone());
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingReactions {
        changes: Mutex<Vec<ReactionChange>>,
    }

    #[async_trait]
    impl ReactionService for RecordingReactions {
        async fn reaction_changed(
            &self,
            change: ReactionChange,
            _event: &ReactionEvent,
            _ctx: &EventContext,
        ) -> Result<(), EventHandlerError> {
            self.changes.lock().await.push(change);
            Ok(())
        }
    }

    #[tokio::test]
    async fn dispatcher_routes_slash_commands() {
        let dispatcher = default_dispatcher();
        let envelope = ChatEnvelope {
            envelope_id: "env-1".to_owned(),
            event: ChatEvent::SlashCommand(SlashCommandPayload {
                name: "help".to_owned(),
                options: BTreeMap::new(),
                community_id: None,
                channel_id: ChannelId("c-1".to_owned()),
                invoker: member("u-1", false),
                permissions: Vec::new(),
                request_id: "req-1".to_owned(),
            }),
        };

        let result =
            dispatcher.dispatch(&envelope, &EventContext::default()).await.expect("dispatch");

        assert!(matches!(result, HandlerResult::Responded(_)));
    }

    #[tokio::test]
    async fn dispatcher_returns_ignored_when_no_handler_registered() {
        let dispatcher = EventDispatcher::new();
        let result = dispatcher
            .dispatch(&message(member("u-1", false), Some("g-1")), &EventContext::default())
            .await
            .expect("dispatch");

        assert_eq!(result, HandlerResult::Ignored);
    }

    #[tokio::test]
    async fn bot_and_direct_messages_never_reach_the_service() {
        let service = Arc::new(CountingMessages::default());
        let mut dispatcher = EventDispatcher::new();
        dispatcher.register(MessageCreatedHandler::new(service.clone()));

        for envelope in [
            message(member("bot", true), Some("g-1")),
            message(member("u-dm", false), None),
            message(member("u-1", false), Some("g-1")),
        ] {
            dispatcher.dispatch(&envelope, &EventContext::default()).await.expect("dispatch");
        }

        assert_eq!(*service.seen.lock().await, vec!["u-1".to_owned()]);
    }

    #[tokio::test]
    async fn reaction_handlers_share_one_service() {
        let service = Arc::new(RecordingReactions::default());
        let mut dispatcher = EventDispatcher::new();
        dispatcher.register(ReactionHandler::added(service.clone()));
        dispatcher.register(ReactionHandler::removed(service.clone()));
        assert_eq!(dispatcher.handler_count(), 2);

        let ctx = EventContext::default();
        for event in [
            ChatEvent::ReactionAdded(reaction(false)),
            ChatEvent::ReactionRemoved(reaction(false)),
            ChatEvent::ReactionAdded(reaction(true)),
        ] {
            let envelope = ChatEnvelope { envelope_id: "env-r".to_owned(), event };
            dispatcher.dispatch(&envelope, &ctx).await.expect("dispatch");
        }

        assert_eq!(
            *service.changes.lock().await,
            vec![ReactionChange::Added, ReactionChange::Removed]
        );
    }
}
