//! Email Activity
//!
//! `SendEmail` reads a message from the step state and either hands it to
//! the message channel right away or defers it to the job queue.
//!
//! | State key         | Type    | Absent  |
//! |-------------------|---------|---------|
//! | `Recipients`      | string  | `""`    |
//! | `Subject`         | string  | `""`    |
//! | `Body`            | string  | `""`    |
//! | `ReplyTo`         | string  | `""`    |
//! | `Bcc`             | string  | `""`    |
//! | `CC`              | string  | `""`    |
//! | `NotifyReadEmail` | boolean | `false` |
//! | `Queued`          | boolean | `false` |
//! | `Priority`        | integer | `0`     |
//!
//! A step without recipients ends with the `Failed` outcome. Channel and
//! queue errors are returned to the engine untouched; the activity never
//! retries.

use std::sync::Arc;

use log::{debug, error, info};

use super::{Activity, ActivityContext, ActivityError, ConfigError, Outcome, Outcomes, WorkflowContext};
use crate::messaging::{JobsQueue, MessageRequest, MessageService, QueuedJob, SEND_MESSAGE_JOB, SMTP_MESSAGE_TYPE};

pub const ACTIVITY_NAME: &str = "SendEmail";
pub const OUTCOME_DONE: &str = "Done";
pub const OUTCOME_FAILED: &str = "Failed";

const CATEGORY: &str = "Messaging";
const DESCRIPTION: &str = "Sends an email to a specific user.";
const FORM: &str = "EmailActivity";

/// Typed view of a `SendEmail` step's state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmailSettings {
    pub message: MessageRequest,
    pub queued: bool,
    pub priority: i64,
}

impl EmailSettings {
    /// Extracts every field, failing on the first value of the wrong type.
    pub fn from_context(context: &ActivityContext) -> Result<Self, ConfigError> {
        let message = MessageRequest {
            subject: context.get_string("Subject")?,
            body: context.get_string("Body")?,
            recipients: context.get_string("Recipients")?,
            reply_to: context.get_string("ReplyTo")?,
            bcc: context.get_string("Bcc")?,
            cc: context.get_string("CC")?,
            notify_read_email: context.get_bool("NotifyReadEmail")?,
        };

        Ok(Self {
            message,
            queued: context.get_bool("Queued")?,
            priority: context.get_int("Priority")?,
        })
    }
}

/// Sends an email synchronously or through the job queue.
pub struct EmailActivity {
    message_service: Arc<dyn MessageService>,
    jobs_queue: Arc<dyn JobsQueue>,
}

impl EmailActivity {
    pub fn new(message_service: Arc<dyn MessageService>, jobs_queue: Arc<dyn JobsQueue>) -> Self {
        Self {
            message_service,
            jobs_queue,
        }
    }
}

impl Activity for EmailActivity {
    fn name(&self) -> &str {
        ACTIVITY_NAME
    }

    fn category(&self) -> &str {
        CATEGORY
    }

    fn description(&self) -> &str {
        DESCRIPTION
    }

    fn form(&self) -> Option<&str> {
        Some(FORM)
    }

    fn possible_outcomes(&self, _workflow: &WorkflowContext, _context: &ActivityContext) -> Vec<Outcome> {
        vec![Outcome::new(OUTCOME_DONE), Outcome::new(OUTCOME_FAILED)]
    }

    fn validate(&self, context: &ActivityContext) -> Result<(), ConfigError> {
        EmailSettings::from_context(context).map(|_| ())
    }

    fn execute(
        &self,
        workflow: &WorkflowContext,
        context: &ActivityContext,
    ) -> Result<Outcomes, ActivityError> {
        // Recipients first: a step without them always ends in `Failed`.
        let recipients = context.get_string("Recipients")?;
        if recipients.trim().is_empty() {
            error!(
                "Email message doesn't have any recipient for Workflow {}",
                workflow.definition_name
            );
            return Ok(Outcomes::single(OUTCOME_FAILED));
        }

        let EmailSettings {
            message,
            queued,
            priority,
        } = EmailSettings::from_context(context)?;

        if !queued {
            debug!("Sending '{}' to {} now", message.subject, message.recipients);
            self.message_service.send(SMTP_MESSAGE_TYPE, &message)?;
        } else {
            info!(
                "Queueing '{}' to {} with priority {}",
                message.subject, message.recipients, priority
            );
            self.jobs_queue.enqueue(
                SEND_MESSAGE_JOB,
                QueuedJob::new(SMTP_MESSAGE_TYPE, message),
                priority,
            )?;
        }

        Ok(Outcomes::single(OUTCOME_DONE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::ChannelError;
    use crate::testing::{RecordingQueue, RecordingService};

    fn setup() -> (Arc<RecordingService>, Arc<RecordingQueue>, EmailActivity) {
        let service = Arc::new(RecordingService::new());
        let queue = Arc::new(RecordingQueue::new());
        let activity = EmailActivity::new(service.clone(), queue.clone());
        (service, queue, activity)
    }

    fn workflow() -> WorkflowContext {
        WorkflowContext::new("welcome-flow", "welcome-flow#1")
    }

    #[test]
    fn test_metadata() {
        let (_, _, activity) = setup();

        assert_eq!(activity.name(), "SendEmail");
        assert_eq!(activity.category(), "Messaging");
        assert_eq!(activity.description(), "Sends an email to a specific user.");
        assert_eq!(activity.form(), Some("EmailActivity"));
    }

    #[test]
    fn test_possible_outcomes_ignore_context() {
        let (_, _, activity) = setup();
        let expected = vec![Outcome::new("Done"), Outcome::new("Failed")];

        assert_eq!(activity.possible_outcomes(&workflow(), &ActivityContext::new()), expected);

        let configured = ActivityContext::new().with("Recipients", "a@x.com").with("Queued", true);
        assert_eq!(activity.possible_outcomes(&workflow(), &configured), expected);
    }

    #[test]
    fn test_send_now() {
        let (service, queue, activity) = setup();
        let context = ActivityContext::new()
            .with("Recipients", "a@x.com")
            .with("Subject", "Hi")
            .with("Body", "Hello")
            .with("Queued", false);

        let outcomes = activity.execute(&workflow(), &context).unwrap();

        assert_eq!(outcomes, Outcomes::single("Done"));
        assert_eq!(queue.enqueue_count(), 0);

        let sent = service.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, SMTP_MESSAGE_TYPE);
        assert_eq!(sent[0].1, MessageRequest::new("a@x.com", "Hi", "Hello"));
    }

    #[test]
    fn test_send_passes_every_field() {
        let (service, _, activity) = setup();
        let context = ActivityContext::new()
            .with("Recipients", "a@x.com")
            .with("Subject", "Hi")
            .with("Body", "Hello")
            .with("ReplyTo", "r@x.com")
            .with("Bcc", "b@x.com")
            .with("CC", "c@x.com")
            .with("NotifyReadEmail", true);

        activity.execute(&workflow(), &context).unwrap();

        let expected = MessageRequest {
            subject: "Hi".to_string(),
            body: "Hello".to_string(),
            recipients: "a@x.com".to_string(),
            reply_to: "r@x.com".to_string(),
            bcc: "b@x.com".to_string(),
            cc: "c@x.com".to_string(),
            notify_read_email: true,
        };
        assert_eq!(service.sent()[0].1, expected);
    }

    #[test]
    fn test_queued_send() {
        let (service, queue, activity) = setup();
        let context = ActivityContext::new()
            .with("Recipients", "a@x.com")
            .with("Queued", true)
            .with("Priority", 5);

        let outcomes = activity.execute(&workflow(), &context).unwrap();

        assert_eq!(outcomes, Outcomes::single("Done"));
        assert_eq!(service.send_count(), 0);

        let jobs = queue.jobs();
        assert_eq!(jobs.len(), 1);
        let (kind, job, priority) = &jobs[0];
        assert_eq!(kind, SEND_MESSAGE_JOB);
        assert_eq!(job.message_type, SMTP_MESSAGE_TYPE);
        assert_eq!(job.parameters.recipients, "a@x.com");
        assert_eq!(*priority, 5);
    }

    #[test]
    fn test_queued_job_carries_every_field() {
        let (service, queue, activity) = setup();
        let context = ActivityContext::new()
            .with("Recipients", "a@x.com; b@x.com")
            .with("Subject", "Weekly report")
            .with("Body", "See attached")
            .with("ReplyTo", "r@x.com")
            .with("Bcc", "b@x.com")
            .with("CC", "c@x.com")
            .with("NotifyReadEmail", true)
            .with("Queued", true)
            .with("Priority", 3);

        activity.execute(&workflow(), &context).unwrap();

        let expected = MessageRequest {
            subject: "Weekly report".to_string(),
            body: "See attached".to_string(),
            recipients: "a@x.com; b@x.com".to_string(),
            reply_to: "r@x.com".to_string(),
            bcc: "b@x.com".to_string(),
            cc: "c@x.com".to_string(),
            notify_read_email: true,
        };
        let jobs = queue.jobs();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].1, QueuedJob::new(SMTP_MESSAGE_TYPE, expected));
        assert_eq!(jobs[0].2, 3);
        assert_eq!(service.send_count(), 0);
    }

    #[test]
    fn test_queued_without_priority_uses_zero() {
        let (_, queue, activity) = setup();
        let context = ActivityContext::new()
            .with("Recipients", "a@x.com")
            .with("Queued", true);

        activity.execute(&workflow(), &context).unwrap();
        assert_eq!(queue.jobs()[0].2, 0);
    }

    #[test]
    fn test_missing_recipients_fail() {
        let contexts = vec![
            ActivityContext::new().with("Queued", false),
            ActivityContext::new().with("Recipients", "").with("Queued", false),
            ActivityContext::new().with("Recipients", "   \t\n").with("Queued", true),
        ];

        for context in contexts {
            let (service, queue, activity) = setup();
            let outcomes = activity.execute(&workflow(), &context).unwrap();

            assert_eq!(outcomes, Outcomes::single("Failed"));
            assert_eq!(service.send_count(), 0);
            assert_eq!(queue.enqueue_count(), 0);
        }
    }

    #[test]
    fn test_missing_recipients_fail_before_type_checks() {
        let (_, _, activity) = setup();
        let context = ActivityContext::new().with("Queued", "soon").with("Body", 3);

        let outcomes = activity.execute(&workflow(), &context).unwrap();
        assert_eq!(outcomes, Outcomes::single("Failed"));
    }

    #[test]
    fn test_repeated_execution_sends_twice() {
        let (service, _, activity) = setup();
        let context = ActivityContext::new().with("Recipients", "a@x.com");

        activity.execute(&workflow(), &context).unwrap();
        activity.execute(&workflow(), &context).unwrap();

        assert_eq!(service.send_count(), 2);
    }

    #[test]
    fn test_channel_failure_propagates() {
        let service = Arc::new(RecordingService::failing());
        let queue = Arc::new(RecordingQueue::new());
        let activity = EmailActivity::new(service, queue.clone());
        let context = ActivityContext::new().with("Recipients", "a@x.com");

        let result = activity.execute(&workflow(), &context);

        assert!(matches!(
            result,
            Err(ActivityError::Channel(ChannelError::DeliveryFailed(_)))
        ));
        assert_eq!(queue.enqueue_count(), 0);
    }

    #[test]
    fn test_queue_failure_propagates() {
        let service = Arc::new(RecordingService::new());
        let queue = Arc::new(RecordingQueue::failing());
        let activity = EmailActivity::new(service.clone(), queue);
        let context = ActivityContext::new()
            .with("Recipients", "a@x.com")
            .with("Queued", true);

        let result = activity.execute(&workflow(), &context);

        assert!(matches!(result, Err(ActivityError::Queue(_))));
        assert_eq!(service.send_count(), 0);
    }

    #[test]
    fn test_wrong_type_is_a_fault() {
        let (service, _, activity) = setup();
        let context = ActivityContext::new()
            .with("Recipients", "a@x.com")
            .with("Queued", "yes");

        let result = activity.execute(&workflow(), &context);

        assert!(matches!(result, Err(ActivityError::Config(_))));
        assert_eq!(service.send_count(), 0);
    }

    #[test]
    fn test_validate() {
        let (_, _, activity) = setup();

        assert!(activity.validate(&ActivityContext::new()).is_ok());
        assert!(activity
            .validate(&ActivityContext::new().with("Priority", "high"))
            .is_err());
    }

    #[test]
    fn test_settings_from_context() {
        let context = ActivityContext::new()
            .with("Recipients", "a@x.com")
            .with("Queued", true)
            .with("Priority", 2);

        let settings = EmailSettings::from_context(&context).unwrap();
        assert!(settings.queued);
        assert_eq!(settings.priority, 2);
        assert_eq!(settings.message.recipients, "a@x.com");
    }
}
