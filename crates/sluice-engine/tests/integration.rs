//! End-to-end pipeline runs against the real engine and worker pool.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use serde_json::{Value, json};

use sluice_engine::{RunError, Runner, RunnerConfig};
use sluice_params::{Parameter, ParameterType, RunConfig};
use sluice_pipeline::{Pipeline, TaskArgs, TaskError};

fn runner() -> Runner {
  Runner::new(RunnerConfig::default())
}

fn config(entries: Value) -> RunConfig {
  match entries {
    Value::Object(map) => map,
    _ => RunConfig::new(),
  }
}

/// Sum every positional argument as integers.
fn sum(args: TaskArgs) -> Result<Value, TaskError> {
  let total: i64 = args
    .positional
    .iter()
    .filter_map(Value::as_i64)
    .sum();
  Ok(json!(total))
}

#[tokio::test(flavor = "multi_thread")]
async fn single_task_pipeline_completes() {
  let pipeline = Pipeline::builder("single", "Single task")
    .body(|graph, _| {
      graph.declare("answer", |_| Ok(json!(42)), vec![], vec![])?;
      Ok(())
    })
    .build()
    .unwrap();

  let report = runner().execute(&pipeline, RunConfig::new()).await.unwrap();
  assert_eq!(report.tasks.len(), 1);
  assert_eq!(report.task("answer").unwrap().result, json!(42));
}

#[tokio::test(flavor = "multi_thread")]
async fn pipeline_without_tasks_terminates() {
  let pipeline = Pipeline::builder("empty", "Empty")
    .body(|_, _| Ok(()))
    .build()
    .unwrap();

  let report = runner().execute(&pipeline, RunConfig::new()).await.unwrap();
  assert!(report.tasks.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn diamond_dependencies_dispatch_after_predecessors() {
  // one, two, three feed four; four must only dispatch once all three
  // completed, whatever order they finish in.
  let pipeline = Pipeline::builder("diamond", "Diamond")
    .body(|graph, _| {
      let mut upstream = Vec::new();
      for (name, delay_ms) in [("one", 30u64), ("two", 5), ("three", 15)] {
        let task = graph.declare(
          name,
          move |_| {
            std::thread::sleep(Duration::from_millis(delay_ms));
            Ok(json!(1))
          },
          vec![],
          vec![],
        )?;
        upstream.push(task);
      }
      graph.declare(
        "four",
        sum,
        upstream.into_iter().map(Into::into).collect(),
        vec![],
      )?;
      Ok(())
    })
    .build()
    .unwrap();

  let report = runner().execute(&pipeline, RunConfig::new()).await.unwrap();

  let four = report.task("four").unwrap();
  assert_eq!(four.result, json!(3));

  for name in ["one", "two", "three"] {
    let upstream = report.task(name).unwrap();
    assert!(upstream.dispatch_index < four.dispatch_index);
    assert!(upstream.finished_at <= four.started_at);
  }
}

#[tokio::test(flavor = "multi_thread")]
async fn chained_results_flow_through_arguments() {
  let pipeline = Pipeline::builder("chain", "Chain")
    .body(|graph, config| {
      let seed = config["seed"].clone();
      let up = graph.declare(
        "up",
        |args| {
          let n = args.get(0).and_then(Value::as_i64).unwrap_or(0);
          Ok(json!(n * 2))
        },
        vec![seed.into()],
        vec![],
      )?;
      graph.declare(
        "down",
        |args| {
          let n = args.positional[0].as_i64().unwrap_or(0);
          Ok(json!(n + 1))
        },
        vec![up.into()],
        vec![],
      )?;
      Ok(())
    })
    .parameter(
      Parameter::builder("seed", ParameterType::Integer)
        .default(json!(21))
        .build()
        .unwrap(),
    )
    .build()
    .unwrap();

  let report = runner().execute(&pipeline, RunConfig::new()).await.unwrap();
  assert_eq!(report.task("up").unwrap().result, json!(42));
  assert_eq!(report.task("down").unwrap().result, json!(43));
}

#[tokio::test(flavor = "multi_thread")]
async fn defaults_reach_the_pipeline_body() {
  // count: int, default 5, required; run({}) invokes the body with 5.
  let seen = Arc::new(AtomicUsize::new(0));
  let seen_in_body = Arc::clone(&seen);

  let pipeline = Pipeline::builder("defaults", "Defaults")
    .parameter(
      Parameter::builder("count", ParameterType::Integer)
        .default(json!(5))
        .required(true)
        .build()
        .unwrap(),
    )
    .body(move |_, config| {
      let count = config["count"].as_i64().unwrap_or(0);
      seen_in_body.store(count as usize, Ordering::SeqCst);
      Ok(())
    })
    .build()
    .unwrap();

  runner().execute(&pipeline, RunConfig::new()).await.unwrap();
  assert_eq!(seen.load(Ordering::SeqCst), 5);
}

#[tokio::test(flavor = "multi_thread")]
async fn empty_required_string_fails_before_any_task() {
  let body_ran = Arc::new(AtomicBool::new(false));
  let body_flag = Arc::clone(&body_ran);

  let pipeline = Pipeline::builder("strict", "Strict")
    .parameter(
      Parameter::builder("name", ParameterType::String)
        .required(true)
        .build()
        .unwrap(),
    )
    .body(move |graph, _| {
      body_flag.store(true, Ordering::SeqCst);
      graph.declare("never", |_| Ok(Value::Null), vec![], vec![])?;
      Ok(())
    })
    .build()
    .unwrap();

  let err = runner()
    .execute(&pipeline, config(json!({"name": ""})))
    .await
    .unwrap_err();

  assert!(matches!(err, RunError::Validation(_)));
  assert!(err.to_string().contains("name is required"));
  assert!(!body_ran.load(Ordering::SeqCst));
}

#[tokio::test(flavor = "multi_thread")]
async fn unknown_configuration_keys_fail_the_run() {
  let pipeline = Pipeline::builder("plain", "Plain")
    .body(|_, _| Ok(()))
    .build()
    .unwrap();

  let err = runner()
    .execute(&pipeline, config(json!({"surprise": 1})))
    .await
    .unwrap_err();
  assert!(matches!(err, RunError::Validation(_)));
}

#[tokio::test(flavor = "multi_thread")]
async fn undeclared_task_functions_are_invisible() {
  // A helper the author defines but never declares must not be dispatched
  // and must not block termination.
  fn never_runs(_: TaskArgs) -> Result<Value, TaskError> {
    Err(TaskError::new("should not run"))
  }
  let _ = never_runs;

  let pipeline = Pipeline::builder("dead-code", "Dead code")
    .body(|graph, _| {
      graph.declare("only", |_| Ok(json!("ran")), vec![], vec![])?;
      Ok(())
    })
    .build()
    .unwrap();

  let report = runner().execute(&pipeline, RunConfig::new()).await.unwrap();
  assert_eq!(report.tasks.len(), 1);
  assert!(report.task("only").is_some());
}

#[tokio::test(flavor = "multi_thread")]
async fn task_failure_fails_the_run_and_orphans_downstream() {
  let downstream_ran = Arc::new(AtomicBool::new(false));
  let downstream_flag = Arc::clone(&downstream_ran);

  let pipeline = Pipeline::builder("failing", "Failing")
    .body(move |graph, _| {
      let bad = graph.declare(
        "bad",
        |_| Err(TaskError::new("exploded")),
        vec![],
        vec![],
      )?;
      let flag = Arc::clone(&downstream_flag);
      graph.declare(
        "after",
        move |_| {
          flag.store(true, Ordering::SeqCst);
          Ok(Value::Null)
        },
        vec![bad.into()],
        vec![],
      )?;
      Ok(())
    })
    .build()
    .unwrap();

  let err = runner().execute(&pipeline, RunConfig::new()).await.unwrap_err();

  match err {
    RunError::TaskFailed { task, source } => {
      assert_eq!(task, "bad");
      assert_eq!(source.to_string(), "exploded");
    }
    other => panic!("unexpected error: {other}"),
  }
  assert!(!downstream_ran.load(Ordering::SeqCst));
}

#[tokio::test(flavor = "multi_thread")]
async fn capacity_bounds_concurrent_tasks() {
  let running = Arc::new(AtomicUsize::new(0));
  let peak = Arc::new(AtomicUsize::new(0));

  let pipeline = {
    let running = Arc::clone(&running);
    let peak = Arc::clone(&peak);
    Pipeline::builder("fanout", "Fan out")
      .body(move |graph, _| {
        for i in 0..8 {
          let running = Arc::clone(&running);
          let peak = Arc::clone(&peak);
          graph.declare(
            format!("task_{i}"),
            move |_| {
              let now = running.fetch_add(1, Ordering::SeqCst) + 1;
              peak.fetch_max(now, Ordering::SeqCst);
              std::thread::sleep(Duration::from_millis(20));
              running.fetch_sub(1, Ordering::SeqCst);
              Ok(json!(i))
            },
            vec![],
            vec![],
          )?;
        }
        Ok(())
      })
      .build()
      .unwrap()
  };

  let runner = Runner::new(RunnerConfig {
    max_workers: 2,
    ..RunnerConfig::default()
  });
  let report = runner.execute(&pipeline, RunConfig::new()).await.unwrap();

  assert_eq!(report.tasks.len(), 8);
  assert!(peak.load(Ordering::SeqCst) <= 2);

  // No task was dispatched twice: dispatch indices are distinct.
  let mut indices: Vec<usize> = report.tasks.iter().map(|t| t.dispatch_index).collect();
  indices.sort_unstable();
  indices.dedup();
  assert_eq!(indices.len(), 8);
}

#[tokio::test(flavor = "multi_thread")]
async fn keyword_arguments_resolve_like_positional_ones() {
  let pipeline = Pipeline::builder("kwargs", "Kwargs")
    .body(|graph, _| {
      let base = graph.declare("base", |_| Ok(json!(10)), vec![], vec![])?;
      graph.declare(
        "scaled",
        |args| {
          let base = args.kwarg("base").and_then(Value::as_i64).unwrap_or(0);
          let factor = args.kwarg("factor").and_then(Value::as_i64).unwrap_or(1);
          Ok(json!(base * factor))
        },
        vec![],
        vec![
          ("base".to_string(), base.into()),
          ("factor".to_string(), json!(3).into()),
        ],
      )?;
      Ok(())
    })
    .build()
    .unwrap();

  let report = runner().execute(&pipeline, RunConfig::new()).await.unwrap();
  assert_eq!(report.task("scaled").unwrap().result, json!(30));
}
