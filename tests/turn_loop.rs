mod common;

use common::{position, scenario, story_updates, ScriptedBackend, StreamScript};
use startup_story_simulator::engine::cancel::CancelToken;
use startup_story_simulator::engine::narrative_client::NarrativeClient;
use startup_story_simulator::engine::protocol::EngineResponse;
use startup_story_simulator::engine::turn_loop::{TurnError, TurnLoop};
use startup_story_simulator::model::generated::Generated;
use startup_story_simulator::model::llm_decode::FALLBACK_CHOICES;
use startup_story_simulator::model::session::SessionStore;
use startup_story_simulator::model::turn::{TurnState, STORY_SEPARATOR};

const ABC: &str = r#"{"choices":["A","B","C"]}"#;

fn started_loop(backend: &ScriptedBackend) -> TurnLoop<ScriptedBackend> {
    let session = SessionStore::new();
    session.initialize(scenario());
    TurnLoop::new(NarrativeClient::new(backend.clone()), session)
}

#[test]
fn start_without_company_name_redirects() {
    let backend = ScriptedBackend::new().stream(StreamScript::Chunks(vec!["never"]));
    let mut turns = TurnLoop::new(NarrativeClient::new(backend.clone()), SessionStore::new());

    let mut events = Vec::new();
    turns.start(&CancelToken::new(), &mut |e| events.push(e));

    assert_eq!(events, vec![EngineResponse::RedirectToSetup]);
    assert_eq!(turns.state(), TurnState::Idle);
    assert_eq!(turns.story(), "");
    assert_eq!(backend.request_count(), 0);
}

#[test]
fn opening_turn_streams_story_then_offers_choices() {
    let backend = ScriptedBackend::new()
        .stream(StreamScript::Chunks(vec!["Hello", " world"]))
        .answer(Some(ABC));
    let mut turns = started_loop(&backend);

    let mut events = Vec::new();
    turns.start(&CancelToken::new(), &mut |e| events.push(e));

    assert_eq!(story_updates(&events), vec!["Hello", "Hello world"]);
    assert_eq!(turns.story(), "Hello world");
    assert_eq!(turns.turn(), 1);

    let generating = position(&events, &EngineResponse::StateChanged(TurnState::GeneratingStory));
    let choosing = position(&events, &EngineResponse::StateChanged(TurnState::GeneratingChoices));
    let ready = position(
        &events,
        &EngineResponse::ChoicesReady(Generated::live(vec!["A".into(), "B".into(), "C".into()])),
    );
    let awaiting = position(&events, &EngineResponse::StateChanged(TurnState::AwaitingSelection));
    let last_update = position(&events, &EngineResponse::StoryChunk(" world".into()));

    assert!(generating < last_update);
    assert_eq!(
        events
            .iter()
            .filter(|e| matches!(e, EngineResponse::StoryChunk(_)))
            .count(),
        2,
        "one event per fragment"
    );
    assert!(last_update < choosing, "choices only after the story completed");
    assert!(choosing < ready && ready < awaiting);

    assert_eq!(turns.state(), TurnState::AwaitingSelection);
    assert_eq!(turns.choices(), ["A", "B", "C"]);

    // Story request first, then the choice request quoting the finished story.
    assert_eq!(backend.request_count(), 2);
    assert!(backend.user_prompt(0).contains("星辰科技"));
    assert!(backend.user_prompt(1).contains("当前故事：\nHello world"));
    assert!(backend.user_prompt(1).contains("公司：星辰科技\n类型：AI教育平台"));
}

#[test]
fn choosing_clears_choices_and_appends_separator() {
    let backend = ScriptedBackend::new()
        .stream(StreamScript::Chunks(vec!["Hello", " world"]))
        .answer(Some(ABC))
        .stream(StreamScript::Chunks(vec!["你选择了B", "。"]))
        .answer(Some(r#"{"choices":["D","E","F","G"]}"#));
    let mut turns = started_loop(&backend);
    turns.start(&CancelToken::new(), &mut |_| {});

    let mut events = Vec::new();
    turns
        .choose("B", &CancelToken::new(), &mut |e| events.push(e))
        .unwrap();

    assert_eq!(events[0], EngineResponse::StateChanged(TurnState::GeneratingStory));

    let separated = format!("Hello world{STORY_SEPARATOR}");
    let cleared = position(&events, &EngineResponse::ChoicesCleared);
    let reset = position(&events, &EngineResponse::StoryReset(separated.clone()));
    let first_update = events
        .iter()
        .position(|e| matches!(e, EngineResponse::StoryChunk(_)))
        .unwrap();
    assert!(cleared < first_update);
    assert!(reset < first_update);

    assert_eq!(
        story_updates(&events),
        vec![
            format!("{separated}你选择了B"),
            format!("{separated}你选择了B。"),
        ]
    );
    // Fragments travel alone; the earlier story is not resent.
    assert!(events.contains(&EngineResponse::StoryChunk("。".into())));
    assert_eq!(turns.turn(), 2);
    assert_eq!(turns.choices(), ["D", "E", "F", "G"]);

    let continuation = backend.user_prompt(2);
    assert!(continuation.contains("玩家选择：B"));
    assert!(continuation.contains("当前故事：\nHello world\n"));
}

#[test]
fn choices_are_rejected_outside_selection() {
    let backend = ScriptedBackend::new()
        .stream(StreamScript::Chunks(vec!["story"]))
        .answer(Some(ABC));
    let mut turns = started_loop(&backend);

    let mut events = Vec::new();
    let err = turns
        .choose("A", &CancelToken::new(), &mut |e| events.push(e))
        .unwrap_err();
    assert_eq!(
        err,
        TurnError::WrongState {
            action: "choose",
            state: TurnState::Idle
        }
    );

    turns.start(&CancelToken::new(), &mut |_| {});
    let err = turns
        .choose("Z", &CancelToken::new(), &mut |e| events.push(e))
        .unwrap_err();
    assert_eq!(err, TurnError::UnknownChoice("Z".into()));

    assert!(events.is_empty());
    assert_eq!(turns.state(), TurnState::AwaitingSelection);
    assert_eq!(turns.choices(), ["A", "B", "C"]);
}

#[test]
fn unparseable_choices_use_the_fixed_fallback() {
    let backend = ScriptedBackend::new()
        .stream(StreamScript::Chunks(vec!["story"]))
        .answer(Some("this is not json"));
    let mut turns = started_loop(&backend);

    let mut events = Vec::new();
    turns.start(&CancelToken::new(), &mut |e| events.push(e));

    let ready = events
        .iter()
        .find_map(|e| match e {
            EngineResponse::ChoicesReady(generated) => Some(generated.clone()),
            _ => None,
        })
        .unwrap();
    assert!(ready.is_fallback());
    assert_eq!(ready.into_value(), FALLBACK_CHOICES.to_vec());
    assert_eq!(turns.state(), TurnState::AwaitingSelection);
}

#[test]
fn broken_stream_reports_and_can_be_retried() {
    let backend = ScriptedBackend::new()
        .stream(StreamScript::Chunks(vec!["opening"]))
        .answer(Some(ABC))
        .stream(StreamScript::BreakAfter(vec!["half a sent"]))
        .stream(StreamScript::Chunks(vec!["whole segment"]))
        .answer(Some(ABC));
    let mut turns = started_loop(&backend);
    turns.start(&CancelToken::new(), &mut |_| {});

    let mut events = Vec::new();
    turns
        .choose("A", &CancelToken::new(), &mut |e| events.push(e))
        .unwrap();

    assert_eq!(turns.state(), TurnState::Interrupted);
    assert!(turns.story().ends_with("half a sent"));
    assert!(events
        .iter()
        .any(|e| matches!(e, EngineResponse::TurnFailed { reason } if reason.contains("connection reset"))));
    assert!(!events
        .iter()
        .any(|e| matches!(e, EngineResponse::ChoicesReady(_))));
    // No choice request was made for the broken turn.
    assert_eq!(backend.request_count(), 3);

    let mut events = Vec::new();
    turns
        .retry(&CancelToken::new(), &mut |e| events.push(e))
        .unwrap();

    let separated = format!("opening{STORY_SEPARATOR}");
    assert!(events.contains(&EngineResponse::StoryReset(separated.clone())));
    assert_eq!(turns.story(), format!("{separated}whole segment"));
    assert_eq!(turns.state(), TurnState::AwaitingSelection);
    assert!(backend.user_prompt(3).contains("玩家选择：A"));

    let err = turns.retry(&CancelToken::new(), &mut |_| {}).unwrap_err();
    assert!(matches!(err, TurnError::WrongState { action: "retry", .. }));
}

#[test]
fn cancelling_mid_stream_returns_to_idle() {
    let backend = ScriptedBackend::new()
        .stream(StreamScript::Chunks(vec!["one", "two", "three"]))
        .answer(Some(ABC));
    let mut turns = started_loop(&backend);

    let cancel = CancelToken::new();
    let trip = cancel.clone();
    let mut events = Vec::new();
    turns.start(&cancel, &mut |e| {
        if matches!(e, EngineResponse::StoryChunk(_)) {
            trip.cancel();
        }
        events.push(e);
    });

    assert_eq!(story_updates(&events), vec!["one"]);
    assert_eq!(turns.state(), TurnState::Idle);
    assert_eq!(events.last(), Some(&EngineResponse::StateChanged(TurnState::Idle)));
    assert!(!events
        .iter()
        .any(|e| matches!(e, EngineResponse::TurnFailed { .. } | EngineResponse::ChoicesReady(_))));
    assert_eq!(backend.request_count(), 1);
}

#[test]
fn reset_forgets_the_story() {
    let backend = ScriptedBackend::new()
        .stream(StreamScript::Chunks(vec!["story"]))
        .answer(Some(ABC));
    let mut turns = started_loop(&backend);
    turns.start(&CancelToken::new(), &mut |_| {});

    let mut events = Vec::new();
    turns.reset(&mut |e| events.push(e));

    assert_eq!(events, vec![EngineResponse::StateChanged(TurnState::Idle)]);
    assert_eq!(turns.story(), "");
    assert!(turns.choices().is_empty());
    assert_eq!(turns.turn(), 0);
}
