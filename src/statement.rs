//! Recording wrapper around a prepared statement.

use std::sync::Arc;

use async_trait::async_trait;

use crate::context::Context;
use crate::convert::values_to_named_values;
use crate::driver::{self, ExecContext, ExecResult, QueryContext, Rows, Statement};
use crate::error::Result;
use crate::record::{Logger, PendingRecord, Record};
use crate::value::{NamedValue, Value};

/// A prepared statement that reports every query and execution.
///
/// Each call clones the template record taken at prepare time, stamps it with
/// the call's arguments, effect flag, start time, duration and outcome, and
/// hands it to the logger before returning. The driver's result is returned
/// untouched.
///
/// The proxy always advertises [`QueryContext`] and [`ExecContext`]; whether
/// the wrapped statement does is decided per call.
pub struct StatementProxy {
    inner: Box<dyn Statement>,
    template: Record,
    logger: Arc<dyn Logger>,
}

impl StatementProxy {
    pub(crate) fn new(inner: Box<dyn Statement>, template: Record, logger: Arc<dyn Logger>) -> Self {
        Self {
            inner,
            template,
            logger,
        }
    }

    /// SQL text the statement was prepared from.
    pub fn query_text(&self) -> &str {
        &self.template.query
    }

    async fn recorded_query(&mut self, ctx: &Context, args: &[NamedValue]) -> Result<Box<dyn Rows>> {
        let pending = start(&self.template, self.logger.as_ref(), ctx, false, args);
        let result = driver::query_statement(&mut *self.inner, ctx, args).await;
        pending.complete(&result);
        result
    }

    async fn recorded_exec(&mut self, ctx: &Context, args: &[NamedValue]) -> Result<ExecResult> {
        let pending = start(&self.template, self.logger.as_ref(), ctx, true, args);
        let result = driver::exec_statement(&mut *self.inner, ctx, args).await;
        pending.complete(&result);
        result
    }
}

fn start<'a>(
    template: &Record,
    logger: &'a dyn Logger,
    ctx: &'a Context,
    effect: bool,
    args: &[NamedValue],
) -> PendingRecord<'a> {
    let mut record = template.clone();
    record.effect = effect;
    record.args = args.to_vec();
    PendingRecord::begin(record, ctx, logger)
}

#[async_trait]
impl Statement for StatementProxy {
    fn num_input(&self) -> Option<usize> {
        self.inner.num_input()
    }

    async fn query(&mut self, args: Vec<Value>) -> Result<Box<dyn Rows>> {
        let ctx = Context::background();
        self.recorded_query(&ctx, &values_to_named_values(args)).await
    }

    async fn exec(&mut self, args: Vec<Value>) -> Result<ExecResult> {
        let ctx = Context::background();
        self.recorded_exec(&ctx, &values_to_named_values(args)).await
    }

    async fn close(&mut self) -> Result<()> {
        self.inner.close().await
    }

    fn as_query_context(&mut self) -> Option<&mut dyn QueryContext> {
        Some(self)
    }

    fn as_exec_context(&mut self) -> Option<&mut dyn ExecContext> {
        Some(self)
    }
}

#[async_trait]
impl QueryContext for StatementProxy {
    async fn query_context(&mut self, ctx: &Context, args: &[NamedValue]) -> Result<Box<dyn Rows>> {
        self.recorded_query(ctx, args).await
    }
}

#[async_trait]
impl ExecContext for StatementProxy {
    async fn exec_context(&mut self, ctx: &Context, args: &[NamedValue]) -> Result<ExecResult> {
        self.recorded_exec(ctx, args).await
    }
}
