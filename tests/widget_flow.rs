use async_trait::async_trait;
use chat_widget::ask::{
    AnswerSource, AskError, AskResponse, ERROR_REPLY, FALLBACK_ANSWER, ResponseFetcher,
    THINKING_TEXT,
};
use chat_widget::widget::filter::OFF_TOPIC_REPLY;
use chat_widget::widget::{
    ChatWidget, KeyPress, KeywordFilter, MessageEntry, RequestToken, Role, Status, Visibility,
    WidgetSettings, WidgetUpdate,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, oneshot};

/// Answers every question immediately.
struct Scripted {
    reply: fn(&str) -> Result<AskResponse, AskError>,
    calls: AtomicUsize,
}

impl Scripted {
    fn new(reply: fn(&str) -> Result<AskResponse, AskError>) -> Arc<Self> {
        Arc::new(Self {
            reply,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AnswerSource for Scripted {
    async fn ask(&self, question: &str) -> Result<AskResponse, AskError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (self.reply)(question)
    }
}

/// Holds each question until the test releases it.
#[derive(Default)]
struct Gated {
    gates: Mutex<HashMap<String, oneshot::Receiver<AskResponse>>>,
}

impl Gated {
    fn gate(&self, question: &str) -> oneshot::Sender<AskResponse> {
        let (tx, rx) = oneshot::channel();
        self.gates.lock().unwrap().insert(question.to_string(), rx);
        tx
    }
}

#[async_trait]
impl AnswerSource for Gated {
    async fn ask(&self, question: &str) -> Result<AskResponse, AskError> {
        let gate = self.gates.lock().unwrap().remove(question);
        match gate {
            Some(rx) => rx.await.map_err(|_| AskError::Status {
                status: 503,
                body: "gate dropped".into(),
            }),
            None => Ok(AskResponse::default()),
        }
    }
}

fn answer(text: &str) -> AskResponse {
    AskResponse {
        answer: Some(text.to_string()),
    }
}

fn widget(source: Arc<dyn AnswerSource>) -> ChatWidget {
    ChatWidget::new(ResponseFetcher::new(source), WidgetSettings::default())
}

fn reply_for(widget: &ChatWidget, token: RequestToken) -> MessageEntry {
    widget
        .snapshot()
        .entries
        .into_iter()
        .find(|e| e.role == Role::Incoming && e.token == token)
        .expect("no reply entry for token")
}

async fn next_update(rx: &mut broadcast::Receiver<WidgetUpdate>) -> WidgetUpdate {
    rx.recv().await.expect("widget update channel closed")
}

#[tokio::test(start_paused = true)]
async fn test_send_appends_trimmed_question_then_answer() {
    let source = Scripted::new(|q| {
        assert_eq!(q, "What is the capital of France?");
        Ok(answer("Paris"))
    });
    let widget = widget(Arc::clone(&source) as Arc<dyn AnswerSource>);

    widget.input("   What is the capital of France?  \n");
    let submission = widget.send().expect("non-empty input must submit");

    let snapshot = widget.snapshot();
    assert_eq!(snapshot.entries.len(), 1);
    assert_eq!(snapshot.entries[0].text, "What is the capital of France?");
    assert_eq!(snapshot.entries[0].role, Role::Outgoing);
    assert_eq!(snapshot.input_value, "");
    assert_eq!(snapshot.input_height, 44);

    // Nothing happens before the reply delay has passed.
    tokio::time::sleep(Duration::from_millis(599)).await;
    assert_eq!(widget.snapshot().entries.len(), 1);
    assert_eq!(source.calls(), 0);

    let reply_id = submission.settled().await.expect("reply task finished");
    let snapshot = widget.snapshot();
    assert_eq!(snapshot.entries.len(), 2);
    assert_eq!(snapshot.entries[reply_id.0].text, "Paris");
    assert_eq!(snapshot.entries[reply_id.0].status, Status::Normal);
    assert_eq!(snapshot.scroll_anchor, Some(reply_id));
    assert_eq!(source.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_placeholder_shows_thinking_then_changes_once() {
    let source = Arc::new(Gated::default());
    let release = source.gate("hello");
    let widget = widget(Arc::clone(&source) as Arc<dyn AnswerSource>);
    let mut updates = widget.subscribe();

    let submission = widget.send_message("hello").unwrap();

    assert!(matches!(
        next_update(&mut updates).await,
        WidgetUpdate::InputReset { height: 44 }
    ));
    assert!(matches!(
        next_update(&mut updates).await,
        WidgetUpdate::EntryAppended { entry } if entry.role == Role::Outgoing
    ));

    let placeholder = match next_update(&mut updates).await {
        WidgetUpdate::EntryAppended { entry } => entry,
        other => panic!("expected placeholder, got {other:?}"),
    };
    assert_eq!(placeholder.text, THINKING_TEXT);
    assert_eq!(placeholder.role, Role::Incoming);
    assert_eq!(placeholder.token, submission.token);

    release.send(answer("hi!")).unwrap();
    submission.settled().await.unwrap();

    match next_update(&mut updates).await {
        WidgetUpdate::EntryUpdated { entry } => {
            assert_eq!(entry.id, placeholder.id);
            assert_eq!(entry.text, "hi!");
        }
        other => panic!("expected update, got {other:?}"),
    }
    assert!(updates.try_recv().is_err(), "placeholder updated more than once");
}

#[tokio::test(start_paused = true)]
async fn test_empty_input_is_ignored() {
    let source = Scripted::new(|_| Ok(answer("unused")));
    let widget = widget(Arc::clone(&source) as Arc<dyn AnswerSource>);

    assert!(widget.send().is_none());
    assert!(widget.send_message("").is_none());
    assert!(widget.send_message("  \n\t  ").is_none());

    tokio::time::sleep(Duration::from_secs(5)).await;

    let snapshot = widget.snapshot();
    assert!(snapshot.entries.is_empty());
    assert_eq!(snapshot.input_value, "");
    assert_eq!(source.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_missing_answer_falls_back() {
    let widget = widget(Scripted::new(|_| Ok(AskResponse::default())));

    let submission = widget.send_message("Who is the CEO?").unwrap();
    let token = submission.token;
    submission.settled().await.unwrap();

    let reply = reply_for(&widget, token);
    assert_eq!(reply.text, FALLBACK_ANSWER);
    assert_eq!(reply.status, Status::Normal);
}

#[tokio::test(start_paused = true)]
async fn test_failure_marks_reply_as_error() {
    let widget = widget(Scripted::new(|_| {
        Err(AskError::Status {
            status: 500,
            body: "Internal Server Error".into(),
        })
    }));

    let submission = widget.send_message("Anything?").unwrap();
    let token = submission.token;
    submission.settled().await.unwrap();

    let reply = reply_for(&widget, token);
    assert_eq!(reply.text, ERROR_REPLY);
    assert_eq!(reply.status, Status::Error);

    // The user's bubble is untouched.
    let outgoing = &widget.snapshot().entries[0];
    assert_eq!(outgoing.text, "Anything?");
    assert_eq!(outgoing.status, Status::Normal);
}

#[tokio::test(start_paused = true)]
async fn test_overlapping_questions_keep_their_own_replies() {
    let source = Arc::new(Gated::default());
    let release_q1 = source.gate("Q1");
    let release_q2 = source.gate("Q2");
    let widget = widget(Arc::clone(&source) as Arc<dyn AnswerSource>);

    let q1 = widget.send_message("Q1").unwrap();
    let q2 = widget.send_message("Q2").unwrap();
    assert_ne!(q1.token, q2.token);

    // Both placeholders are on screen before either answer arrives.
    tokio::time::sleep(Duration::from_millis(700)).await;
    assert_eq!(reply_for(&widget, q1.token).text, THINKING_TEXT);
    assert_eq!(reply_for(&widget, q2.token).text, THINKING_TEXT);

    // Answers arrive out of submission order.
    let (t1, t2) = (q1.token, q2.token);
    release_q2.send(answer("A2")).unwrap();
    q2.settled().await.unwrap();
    assert_eq!(reply_for(&widget, t2).text, "A2");
    assert_eq!(reply_for(&widget, t1).text, THINKING_TEXT);

    release_q1.send(answer("A1")).unwrap();
    q1.settled().await.unwrap();
    assert_eq!(reply_for(&widget, t1).text, "A1");
    assert_eq!(reply_for(&widget, t2).text, "A2");

    let entries = widget.snapshot().entries;
    let outgoing: Vec<_> = entries
        .iter()
        .filter(|e| e.role == Role::Outgoing)
        .map(|e| e.text.as_str())
        .collect();
    assert_eq!(outgoing, ["Q1", "Q2"]);
    assert_eq!(entries.iter().filter(|e| e.role == Role::Incoming).count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_hung_service_leaves_placeholder() {
    let source = Arc::new(Gated::default());
    let _held = source.gate("still there?");
    let widget = widget(Arc::clone(&source) as Arc<dyn AnswerSource>);

    let submission = widget.send_message("still there?").unwrap();
    tokio::time::sleep(Duration::from_secs(3600)).await;

    assert_eq!(reply_for(&widget, submission.token).text, THINKING_TEXT);
}

#[tokio::test(start_paused = true)]
async fn test_enter_shortcut_gating() {
    let widget = widget(Scripted::new(|_| Ok(answer("ok"))));

    widget.input("line one");
    assert!(widget.key_down(&KeyPress::new("Enter").with_shift(), 1280).is_none());
    assert!(widget.key_down(&KeyPress::new("Enter"), 500).is_none());
    assert!(widget.key_down(&KeyPress::new("a"), 1280).is_none());
    assert!(widget.snapshot().entries.is_empty());
    assert_eq!(widget.snapshot().input_value, "line one");

    let submission = widget
        .key_down(&KeyPress::new("Enter"), 1280)
        .expect("bare Enter on desktop submits");
    submission.settled().await.unwrap();

    let entries = widget.snapshot().entries;
    assert_eq!(entries[0].text, "line one");
    assert_eq!(entries[1].text, "ok");
}

#[tokio::test(start_paused = true)]
async fn test_input_auto_grows() {
    let widget = widget(Scripted::new(|_| Ok(answer("ok"))));

    assert_eq!(widget.input("a"), 44);
    assert_eq!(widget.input("a\nb"), 64);
    assert_eq!(widget.input("a\nb\nc\nd\ne\nf\ng\nh\ni\nj"), 224);

    widget.send().unwrap();
    assert_eq!(widget.snapshot().input_height, 44);
}

#[tokio::test(start_paused = true)]
async fn test_keyword_filter_blocks_off_topic_questions() {
    let source = Scripted::new(|_| Ok(answer("on topic")));
    let settings = WidgetSettings {
        filter: KeywordFilter::new(["kmtec"]),
        ..WidgetSettings::default()
    };
    let widget = ChatWidget::new(
        ResponseFetcher::new(Arc::clone(&source) as Arc<dyn AnswerSource>),
        settings,
    );

    let off = widget.send_message("What's the weather?").unwrap();
    let off_token = off.token;
    off.settled().await.unwrap();
    assert_eq!(reply_for(&widget, off_token).text, OFF_TOPIC_REPLY);
    assert_eq!(source.calls(), 0);

    let on = widget.send_message("Where is KMTEC based?").unwrap();
    let on_token = on.token;
    on.settled().await.unwrap();
    assert_eq!(reply_for(&widget, on_token).text, "on topic");
    assert_eq!(source.calls(), 1);
}

#[tokio::test]
async fn test_toggle_twice_restores_visibility() {
    let widget = widget(Scripted::new(|_| Ok(AskResponse::default())));
    let mut updates = widget.subscribe();

    assert_eq!(widget.visibility(), Visibility::Hidden);
    assert_eq!(widget.toggle(), Visibility::Shown);
    assert_eq!(widget.toggle(), Visibility::Hidden);

    assert_eq!(widget.open(), Visibility::Shown);
    assert_eq!(widget.close(), Visibility::Hidden);

    assert_eq!(
        next_update(&mut updates).await,
        WidgetUpdate::Visibility {
            visibility: Visibility::Shown
        }
    );
}
