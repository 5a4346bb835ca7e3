use quiz_core::model::{Choice, QuestionDraft, Stage, StageError};

struct BuiltinQuestion {
    prompt: &'static str,
    choices: [&'static str; 4],
    correct: Choice,
    stage: u8,
    hint: &'static str,
}

const BUILTIN: &[BuiltinQuestion] = &[
    BuiltinQuestion {
        prompt: "What does 2 ** 3 evaluate to in Python?",
        choices: ["6", "8", "9", "12"],
        correct: Choice::B,
        stage: 1,
        hint: "The ** operator raises to a power.",
    },
    BuiltinQuestion {
        prompt: "Which Git command lists local branches?",
        choices: ["git status", "git branch", "git log", "git checkout"],
        correct: Choice::B,
        stage: 1,
        hint: "It is named after what it lists.",
    },
    BuiltinQuestion {
        prompt: "Which language styles modern web pages?",
        choices: ["HTML", "CSS", "SQL", "Bash"],
        correct: Choice::B,
        stage: 1,
        hint: "It controls colors, sizes and layout.",
    },
    BuiltinQuestion {
        prompt: "Which protocol secures HTTP by default?",
        choices: ["FTP", "SSH", "HTTPS", "SMTP"],
        correct: Choice::C,
        stage: 2,
        hint: "Add an S to HTTP.",
    },
    BuiltinQuestion {
        prompt: "Which language is mainly used for native iOS development?",
        choices: ["Kotlin", "Swift", "Ruby", "Go"],
        correct: Choice::B,
        stage: 2,
        hint: "Apple introduced it in 2014.",
    },
    BuiltinQuestion {
        prompt: "Which tool installs Python packages?",
        choices: ["pip", "node", "docker", "gradle"],
        correct: Choice::A,
        stage: 2,
        hint: "Usually followed by 'install'.",
    },
    BuiltinQuestion {
        prompt: "Which design pattern guarantees a single global instance?",
        choices: ["Singleton", "Observer", "Strategy", "Decorator"],
        correct: Choice::A,
        stage: 3,
        hint: "Its name means 'only one'.",
    },
    BuiltinQuestion {
        prompt: "Which HTTP method is conventionally used to create a resource?",
        choices: ["GET", "POST", "DELETE", "PATCH"],
        correct: Choice::B,
        stage: 3,
        hint: "HTML forms send it.",
    },
    BuiltinQuestion {
        prompt: "What is the main benefit of a database index?",
        choices: [
            "Larger tables",
            "Faster lookups",
            "Preventing deletes",
            "Automatic encryption",
        ],
        correct: Choice::B,
        stage: 3,
        hint: "Think query performance.",
    },
    BuiltinQuestion {
        prompt: "Which protocol enables real-time, two-way communication on the web?",
        choices: ["WebSocket", "Telnet", "IMAP", "POP3"],
        correct: Choice::A,
        stage: 4,
        hint: "It starts with 'Web'.",
    },
    BuiltinQuestion {
        prompt: "Which architecture separates interface, logic and data?",
        choices: ["MVC", "FTP", "REST", "CLI"],
        correct: Choice::A,
        stage: 4,
        hint: "A three-letter acronym taught everywhere.",
    },
];

/// The question set inserted into an empty catalog.
///
/// # Errors
///
/// Returns `StageError` if a built-in entry carries an out-of-range stage.
pub fn builtin_questions() -> Result<Vec<QuestionDraft>, StageError> {
    BUILTIN
        .iter()
        .map(|q| {
            Ok(QuestionDraft::new(
                q.prompt,
                q.choices,
                q.correct,
                Stage::new(q.stage)?,
                q.hint,
            ))
        })
        .collect()
}
