// SPDX-License-Identifier: MIT

//! `new WebSocketPair()` (spec §4.10): two linked in-process sockets.
//! Before `accept()` on a given side, incoming messages/close events from
//! the peer queue up; `accept()` flushes them in order.

use crate::error::{WsError, WsResult};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ReadyState {
    Connecting = 0,
    Open = 1,
    Closing = 2,
    Closed = 3,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Text(String),
    Binary(Vec<u8>),
}

#[derive(Debug, Clone)]
pub struct CloseEvent {
    pub code: Option<u16>,
    pub reason: Option<String>,
    pub was_clean: bool,
}

type MessageHandler = Box<dyn Fn(&Message) + Send + Sync>;
type CloseHandler = Box<dyn Fn(&CloseEvent) + Send + Sync>;
type ErrorHandler = Box<dyn Fn(&str) + Send + Sync>;

#[derive(Default)]
struct Listeners {
    on_message: Vec<MessageHandler>,
    on_close: Vec<CloseHandler>,
    on_error: Vec<ErrorHandler>,
    onmessage_slot: Option<MessageHandler>,
    onclose_slot: Option<CloseHandler>,
    onerror_slot: Option<ErrorHandler>,
}

enum QueuedEvent {
    Message(Message),
    Close(CloseEvent),
}

struct Inner {
    index: u8,
    state: Mutex<ReadyState>,
    peer: Mutex<Weak<Inner>>,
    queue: Mutex<Vec<QueuedEvent>>,
    listeners: Mutex<Listeners>,
}

impl Inner {
    fn dispatch_message(&self, message: Message) {
        let listeners = self.listeners.lock();
        for handler in &listeners.on_message {
            handler(&message);
        }
        if let Some(handler) = &listeners.onmessage_slot {
            handler(&message);
        }
    }

    fn dispatch_close(&self, event: CloseEvent) {
        let listeners = self.listeners.lock();
        for handler in &listeners.on_close {
            handler(&event);
        }
        if let Some(handler) = &listeners.onclose_slot {
            handler(&event);
        }
    }

    fn dispatch_error(&self, message: &str) {
        let listeners = self.listeners.lock();
        for handler in &listeners.on_error {
            handler(message);
        }
        if let Some(handler) = &listeners.onerror_slot {
            handler(message);
        }
    }

    fn receive_message(&self, message: Message) {
        let state = *self.state.lock();
        match state {
            ReadyState::Connecting => self.queue.lock().push(QueuedEvent::Message(message)),
            ReadyState::Open => self.dispatch_message(message),
            ReadyState::Closing | ReadyState::Closed => {}
        }
    }

    fn receive_close(&self, event: CloseEvent) {
        let mut state = self.state.lock();
        if *state == ReadyState::Closed {
            return;
        }
        if *state == ReadyState::Connecting {
            drop(state);
            self.queue.lock().push(QueuedEvent::Close(event));
            return;
        }
        *state = ReadyState::Closed;
        drop(state);
        self.dispatch_close(event);
    }
}

/// One side of a `WebSocketPair`.
pub struct WebSocket {
    inner: Arc<Inner>,
}

impl WebSocket {
    pub fn index(&self) -> u8 {
        self.inner.index
    }

    pub fn ready_state(&self) -> ReadyState {
        *self.inner.state.lock()
    }

    /// Transitions CONNECTING -> OPEN and flushes any events the peer
    /// delivered before this side accepted.
    pub fn accept(&self) {
        {
            let mut state = self.inner.state.lock();
            if *state != ReadyState::Connecting {
                return;
            }
            *state = ReadyState::Open;
        }
        let queued = std::mem::take(&mut *self.inner.queue.lock());
        for event in queued {
            match event {
                QueuedEvent::Message(message) => self.inner.dispatch_message(message),
                QueuedEvent::Close(event) => {
                    *self.inner.state.lock() = ReadyState::Closed;
                    self.inner.dispatch_close(event);
                }
            }
        }
    }

    pub fn send(&self, message: Message) -> WsResult<()> {
        match self.ready_state() {
            ReadyState::Connecting => Err(WsError::NotAccepted),
            ReadyState::Open => {
                if let Some(peer) = self.peer() {
                    peer.inner.receive_message(message);
                }
                Ok(())
            }
            ReadyState::Closing | ReadyState::Closed => Err(WsError::NotOpen),
        }
    }

    pub fn send_text(&self, text: impl Into<String>) -> WsResult<()> {
        self.send(Message::Text(text.into()))
    }

    pub fn send_binary(&self, bytes: impl Into<Vec<u8>>) -> WsResult<()> {
        self.send(Message::Binary(bytes.into()))
    }

    /// Idempotent: closing an already-closed (or closing) socket is a no-op.
    /// Delivers a close event to the peer and transitions both sides to
    /// CLOSED.
    pub fn close(&self, code: Option<u16>, reason: Option<String>) {
        let mut state = self.inner.state.lock();
        if *state == ReadyState::Closed || *state == ReadyState::Closing {
            return;
        }
        let was_accepted = *state == ReadyState::Open;
        *state = ReadyState::Closed;
        drop(state);

        let event = CloseEvent { code, reason, was_clean: true };
        if was_accepted {
            self.inner.dispatch_close(event.clone());
        }
        if let Some(peer) = self.peer() {
            peer.inner.receive_close(event);
        }
    }

    pub fn on_message(&self, handler: impl Fn(&Message) + Send + Sync + 'static) {
        self.inner.listeners.lock().on_message.push(Box::new(handler));
    }

    pub fn on_close(&self, handler: impl Fn(&CloseEvent) + Send + Sync + 'static) {
        self.inner.listeners.lock().on_close.push(Box::new(handler));
    }

    pub fn on_error(&self, handler: impl Fn(&str) + Send + Sync + 'static) {
        self.inner.listeners.lock().on_error.push(Box::new(handler));
    }

    pub fn set_onmessage(&self, handler: impl Fn(&Message) + Send + Sync + 'static) {
        self.inner.listeners.lock().onmessage_slot = Some(Box::new(handler));
    }

    pub fn set_onclose(&self, handler: impl Fn(&CloseEvent) + Send + Sync + 'static) {
        self.inner.listeners.lock().onclose_slot = Some(Box::new(handler));
    }

    pub fn set_onerror(&self, handler: impl Fn(&str) + Send + Sync + 'static) {
        self.inner.listeners.lock().onerror_slot = Some(Box::new(handler));
    }

    /// Surfaces an error to this side's listeners without touching
    /// `readyState` — the in-process emulator has no transport errors of
    /// its own, so this exists for adapter code that wants to simulate one.
    pub fn raise_error(&self, message: &str) {
        self.inner.dispatch_error(message);
    }

    fn peer(&self) -> Option<WebSocket> {
        self.inner.peer.lock().upgrade().map(|inner| WebSocket { inner })
    }
}

pub struct WebSocketPair;

impl WebSocketPair {
    pub fn new() -> (WebSocket, WebSocket) {
        let a = Arc::new(Inner {
            index: 0,
            state: Mutex::new(ReadyState::Connecting),
            peer: Mutex::new(Weak::new()),
            queue: Mutex::new(Vec::new()),
            listeners: Mutex::new(Listeners::default()),
        });
        let b = Arc::new(Inner {
            index: 1,
            state: Mutex::new(ReadyState::Connecting),
            peer: Mutex::new(Weak::new()),
            queue: Mutex::new(Vec::new()),
            listeners: Mutex::new(Listeners::default()),
        });
        *a.peer.lock() = Arc::downgrade(&b);
        *b.peer.lock() = Arc::downgrade(&a);
        (WebSocket { inner: a }, WebSocket { inner: b })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn both_sides_start_connecting() {
        let (a, b) = WebSocketPair::new();
        assert_eq!(a.ready_state(), ReadyState::Connecting);
        assert_eq!(b.ready_state(), ReadyState::Connecting);
        assert_eq!(a.index(), 0);
        assert_eq!(b.index(), 1);
    }

    #[test]
    fn send_before_accept_is_rejected() {
        let (a, _b) = WebSocketPair::new();
        assert!(matches!(a.send_text("hi"), Err(WsError::NotAccepted)));
    }

    #[test]
    fn messages_queue_until_accept_then_flush_in_order() {
        let (a, b) = WebSocketPair::new();
        a.accept();
        let received = Arc::new(Mutex::new(Vec::new()));
        let received2 = received.clone();
        b.on_message(move |m| received2.lock().push(m.clone()));

        a.send_text("one").unwrap();
        a.send_text("two").unwrap();
        assert!(received.lock().is_empty());

        b.accept();
        assert_eq!(
            *received.lock(),
            vec![Message::Text("one".to_string()), Message::Text("two".to_string())]
        );
    }

    #[test]
    fn open_sides_deliver_messages_immediately() {
        let (a, b) = WebSocketPair::new();
        a.accept();
        b.accept();
        let count = Arc::new(AtomicUsize::new(0));
        let count2 = count.clone();
        b.on_message(move |_| {
            count2.fetch_add(1, Ordering::SeqCst);
        });
        a.send_binary(vec![1, 2, 3]).unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn close_is_idempotent_and_transitions_both_sides() {
        let (a, b) = WebSocketPair::new();
        a.accept();
        b.accept();
        let closed = Arc::new(Mutex::new(0));
        let closed2 = closed.clone();
        b.on_close(move |_| *closed2.lock() += 1);

        a.close(Some(1000), Some("bye".to_string()));
        a.close(Some(4000), None);

        assert_eq!(a.ready_state(), ReadyState::Closed);
        assert_eq!(b.ready_state(), ReadyState::Closed);
        assert_eq!(*closed.lock(), 1);
    }

    #[test]
    fn close_before_peer_accepts_is_queued() {
        let (a, b) = WebSocketPair::new();
        a.accept();
        a.close(Some(1000), None);

        let closed = Arc::new(Mutex::new(false));
        let closed2 = closed.clone();
        b.on_close(move |_| *closed2.lock() = true);
        b.accept();

        assert!(*closed.lock());
        assert_eq!(b.ready_state(), ReadyState::Closed);
    }

    #[test]
    fn binary_round_trips_as_a_byte_buffer() {
        let (a, b) = WebSocketPair::new();
        a.accept();
        b.accept();
        let received = Arc::new(Mutex::new(None));
        let received2 = received.clone();
        b.on_message(move |m| *received2.lock() = Some(m.clone()));
        a.send_binary(vec![9, 8, 7]).unwrap();
        assert_eq!(*received.lock(), Some(Message::Binary(vec![9, 8, 7])));
    }
}
