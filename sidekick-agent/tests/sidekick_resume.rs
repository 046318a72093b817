mod common;

use std::sync::Arc;

use common::{answer, call, tools, verdict, EchoLlm, ScriptedJudge, ScriptedLlm};
use serde_json::json;
use sidekick_agent::{Sidekick, SidekickUpdate, EVALUATOR, TOOLS, WORKER};
use sidekick_core::{Message, SidekickError};

#[tokio::test]
async fn resumed_thread_matches_full_replay() {
    let llm = ScriptedLlm::new(vec![
        answer("Product X costs 19.99 USD"),
        answer("Product Y costs 5.00 USD"),
        answer("Product Y costs 5.00 USD"),
    ]);
    let judge = ScriptedJudge::new(vec![
        verdict("ok", true, false),
        verdict("ok for Y", true, false),
        verdict("ok for Y", true, false),
    ]);
    let sidekick = Sidekick::builder()
        .llm(llm.clone())
        .judge(judge)
        .build()
        .unwrap();

    sidekick
        .run("Find the price of product X", "Must state price in USD", "resumed")
        .await
        .unwrap();
    let prior = sidekick.state("resumed").await.unwrap().unwrap();

    let resumed = sidekick
        .invoke(
            SidekickUpdate::turn("And product Y?", "Must state price in USD"),
            "resumed",
        )
        .await
        .unwrap();

    let mut seed = prior.into_update();
    seed.messages.push(Message::user("And product Y?"));
    seed.feedback_on_work = Some(None);
    seed.success_criteria_met = Some(false);
    seed.user_input_needed = Some(false);
    let replayed = sidekick.invoke(seed, "replayed").await.unwrap();

    assert_eq!(resumed, replayed);
    let requests = llm.requests();
    assert_eq!(requests[1], requests[2]);
}

#[tokio::test]
async fn model_failure_keeps_last_checkpoint_and_resumes() {
    let llm = ScriptedLlm::new(vec![
        call("c1", "price_lookup", json!({"product": "X"})),
        Err(SidekickError::LlmProvider("429: rate limited".to_string())),
        answer("Product X costs 19.99 USD"),
    ]);
    let judge = ScriptedJudge::new(vec![verdict("Price is stated in USD", true, false)]);
    let sidekick = Sidekick::builder()
        .llm(llm)
        .judge(judge)
        .tools(tools())
        .build()
        .unwrap();

    let err = sidekick
        .run("Find the price of product X", "Must state price in USD", "flaky")
        .await
        .unwrap_err();
    assert!(matches!(err, SidekickError::LlmProvider(ref msg) if msg.contains("429")));

    let saved = sidekick.state("flaky").await.unwrap().unwrap();
    assert_eq!(saved.messages.last().unwrap().tool_call_id.as_deref(), Some("c1"));
    let nodes: Vec<String> = sidekick
        .history("flaky")
        .await
        .unwrap()
        .into_iter()
        .map(|h| h.node)
        .collect();
    assert_eq!(nodes, [WORKER, TOOLS]);

    let reply = sidekick.resume("flaky").await.unwrap();
    assert_eq!(reply.answer, "Product X costs 19.99 USD");
    assert!(reply.state.success_criteria_met);
    let nodes: Vec<String> = sidekick
        .history("flaky")
        .await
        .unwrap()
        .into_iter()
        .map(|h| h.node)
        .collect();
    assert_eq!(nodes, [WORKER, TOOLS, WORKER, EVALUATOR]);
}

#[tokio::test]
async fn malformed_verdict_fails_without_partial_update() {
    let llm = ScriptedLlm::new(vec![
        answer("Product X costs 19.99 USD"),
        answer("Looks good to me"),
    ]);
    let sidekick = Sidekick::builder().llm(llm).build().unwrap();

    let err = sidekick
        .run("Find the price of product X", "Must state price in USD", "garbled")
        .await
        .unwrap_err();
    assert!(matches!(err, SidekickError::ParseFailed { .. }));

    let saved = sidekick.state("garbled").await.unwrap().unwrap();
    assert_eq!(
        saved.messages.last(),
        Some(&Message::assistant("Product X costs 19.99 USD"))
    );
    assert_eq!(saved.feedback_on_work, None);
    assert!(!saved.success_criteria_met);
    assert!(!saved.user_input_needed);
}

#[tokio::test]
async fn finished_thread_has_nothing_to_resume() {
    let llm = ScriptedLlm::new(vec![answer("done")]);
    let judge = ScriptedJudge::new(vec![verdict("ok", true, false)]);
    let sidekick = Sidekick::builder().llm(llm).judge(judge).build().unwrap();

    sidekick.run("task", "criteria", "complete").await.unwrap();
    assert!(sidekick.resume("complete").await.is_err());
    assert!(sidekick.resume("never-started").await.is_err());
}

#[tokio::test]
async fn concurrent_threads_run_independently() {
    let judge = ScriptedJudge::new((0..8).map(|_| verdict("ok", true, false)).collect());
    let sidekick = Arc::new(
        Sidekick::builder()
            .llm(Arc::new(EchoLlm))
            .judge(judge)
            .build()
            .unwrap(),
    );

    let mut handles = Vec::new();
    for index in 0..8 {
        let sidekick = sidekick.clone();
        handles.push(tokio::spawn(async move {
            let thread_id = sidekick.reset();
            let reply = sidekick
                .run(format!("task {index}"), "criteria", &thread_id)
                .await
                .unwrap();
            (index, thread_id, reply)
        }));
    }
    for handle in handles {
        let (index, thread_id, reply) = handle.await.unwrap();
        assert_eq!(reply.answer, format!("echo: task {index}"));
        assert_eq!(sidekick.history(&thread_id).await.unwrap().len(), 2);
    }
}
