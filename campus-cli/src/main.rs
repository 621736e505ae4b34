mod render;

use anyhow::{bail, Context, Result};
use campus_core::dashboard::{performance_report, DashboardStats, StudentOverview, TeacherOverview};
use campus_core::enrollments::{my_enrollments, ApplicationForm, Decision, DecisionOutcome, EnrollmentDesk};
use campus_core::grades::{format_grade, GradeField, GradeSheet, StatusKind, Transcript};
use campus_core::logging::init_tracing;
use campus_core::resource::{Departments, Grades, Modules, Programs, Users};
use campus_core::screen::DeleteOutcome;
use campus_core::{
    guard, landing_route, Access, AuthContext, CampusConfig, CampusHttpClient, QueryClient, RecordId, Resource,
    ResourceForm, ResourceListScreen, Role, Route, SessionStore,
};
use clap::{Parser, Subcommand};
use render::{print_list, print_pairs, print_table, StdinConfirm};
use std::path::PathBuf;
use tracing::debug;

#[derive(Parser, Debug)]
#[command(name = "campus")]
#[command(about = "Academic administration portal from the terminal")]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to ./campus.toml)
    #[arg(long, global = true, env = "CAMPUS_CONFIG")]
    config: Option<PathBuf>,

    /// Answer yes to every confirmation prompt
    #[arg(short = 'y', long, global = true)]
    yes: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Log in and store the session
    Login {
        email: String,
        #[arg(long, env = "CAMPUS_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Forget the stored session
    Logout,
    /// Show who is logged in
    Whoami,
    /// Swap the access token using the stored refresh token
    Refresh,
    /// Manage departments
    Departments {
        #[command(subcommand)]
        action: CrudAction,
    },
    /// Manage programs (filières)
    Programs {
        #[command(subcommand)]
        action: CrudAction,
    },
    /// Manage modules
    Modules {
        #[command(subcommand)]
        action: CrudAction,
    },
    /// List user accounts
    Users {
        #[arg(long)]
        role: Option<Role>,
        /// Case-insensitive filter on username and email
        search: Option<String>,
    },
    /// Enrollment review and student applications
    Enrollments {
        #[command(subcommand)]
        action: EnrollmentAction,
    },
    /// Teacher grade sheets
    Grades {
        #[command(subcommand)]
        action: GradeAction,
    },
    /// The logged-in student's grades and average
    Transcript,
    /// Home screen for the logged-in role
    Dashboard,
    /// Direction performance report
    Performance,
}

#[derive(Subcommand, Debug)]
enum CrudAction {
    List {
        search: Option<String>,
    },
    /// Create a record from `--set field=value` pairs
    Create {
        #[arg(long = "set", value_name = "FIELD=VALUE")]
        set: Vec<String>,
    },
    /// Edit a record; unset fields keep their current values
    Update {
        id: RecordId,
        #[arg(long = "set", value_name = "FIELD=VALUE")]
        set: Vec<String>,
    },
    Delete {
        id: RecordId,
    },
}

#[derive(Subcommand, Debug)]
enum EnrollmentAction {
    /// Every enrollment (admin)
    List { search: Option<String> },
    /// Enrollments waiting for a decision
    Pending,
    Validate { id: RecordId },
    Reject {
        id: RecordId,
        #[arg(long)]
        reason: Option<String>,
    },
    /// The logged-in student's enrollments
    Mine { search: Option<String> },
    /// Apply to a program
    Apply {
        #[arg(long)]
        program: Option<RecordId>,
        #[arg(long)]
        year: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
enum GradeAction {
    /// Modules assigned to the logged-in teacher
    Modules {
        /// Case-insensitive filter on module name and code
        search: Option<String>,
    },
    /// Grade sheet of one module
    Show {
        module: RecordId,
        #[arg(long)]
        year: Option<String>,
        search: Option<String>,
    },
    /// Apply `--grade student:field=value` edits and save the whole sheet
    Save {
        module: RecordId,
        #[arg(long)]
        year: Option<String>,
        #[arg(long = "grade", value_name = "STUDENT:FIELD=VALUE", required = true)]
        grades: Vec<String>,
    },
}

struct App {
    config: CampusConfig,
    auth: AuthContext,
    client: CampusHttpClient,
    cache: QueryClient,
    confirm: StdinConfirm,
}

impl App {
    fn new(cli: &Cli) -> Result<Self> {
        let config = match &cli.config {
            Some(path) => CampusConfig::load_from(path)?,
            None => CampusConfig::load()?,
        };
        debug!("Using API at {}", config.api.base_url);

        let auth = AuthContext::init(SessionStore::new(config.session.path.clone()));
        let mut client = CampusHttpClient::from_config(&config.api).context("Failed to build HTTP client")?;
        client.set_access_token(auth.access_token().map(str::to_string));
        let cache = QueryClient::new(config.api.query_retries);

        Ok(Self {
            config,
            auth,
            client,
            cache,
            confirm: StdinConfirm { assume_yes: cli.yes },
        })
    }

    fn enter(&self, route: Route) -> Result<()> {
        match guard(route, self.auth.session()) {
            Access::Allowed => Ok(()),
            Access::RedirectToLogin => bail!("🔒 {} needs a session, run `campus login` first", route),
            Access::Forbidden { role } => bail!("⛔ {} is not available to {}", route, role.label()),
        }
    }

    fn year(&self, year: Option<String>) -> String {
        year.unwrap_or_else(|| self.config.application.default_academic_year.clone())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing("warn");
    let cli = Cli::parse();
    let mut app = App::new(&cli)?;

    match cli.command {
        Commands::Login { email, password } => {
            let session = app.auth.login(&app.client, &email, &password).await?;
            println!("✅ Logged in as {} ({})", session.username, session.role.label());
            println!("➡️  {}", landing_route(session.role).path());
        }
        Commands::Logout => {
            app.auth.logout()?;
            println!("👋 Logged out");
        }
        Commands::Whoami => match app.auth.session() {
            Some(s) => print_pairs(&[
                ("User".to_string(), s.username.clone()),
                ("Role".to_string(), s.role.label().to_string()),
                ("Since".to_string(), s.logged_in_at.to_rfc3339()),
                ("Home".to_string(), landing_route(s.role).path()),
            ]),
            None => println!("Not logged in."),
        },
        Commands::Refresh => {
            app.auth.refresh(&app.client).await?;
            println!("🔄 Access token refreshed");
        }
        Commands::Departments { action } => run_resource::<Departments>(&app, Route::AdminDepartments, action).await?,
        Commands::Programs { action } => run_resource::<Programs>(&app, Route::AdminPrograms, action).await?,
        Commands::Modules { action } => run_resource::<Modules>(&app, Route::AdminModules, action).await?,
        Commands::Users { role, search } => {
            app.enter(Route::AdminUsers)?;
            let mut screen = match role {
                Some(role) => ResourceListScreen::<Users>::filtered_by("role", role.as_str()),
                None => ResourceListScreen::<Users>::new(),
            };
            screen.load(&app.client, &app.cache).await;
            if let Some(search) = search {
                screen.set_query(search);
            }
            print_list(&screen)?;
        }
        Commands::Enrollments { action } => run_enrollments(&app, action).await?,
        Commands::Grades { action } => run_grades(&app, action).await?,
        Commands::Transcript => {
            app.enter(Route::StudentGrades)?;
            let mut screen = ResourceListScreen::<Grades>::new();
            screen.load(&app.client, &app.cache).await;
            print_list(&screen)?;
            let transcript = Transcript::new(screen.records().map(<[_]>::to_vec).unwrap_or_default());
            println!(
                "📊 Average {} | passed {}/{}",
                transcript.average_label(),
                transcript.passed_count(),
                transcript.grades().len()
            );
        }
        Commands::Dashboard => {
            let role = match app.auth.role() {
                Some(role) => role,
                None => bail!("🔒 Not logged in, run `campus login` first"),
            };
            let route = landing_route(role);
            app.enter(route)?;
            show_dashboard(&app, role).await?;
        }
        Commands::Performance => {
            app.enter(Route::DirectionPerformance)?;
            let report = performance_report(&app.client, &app.cache).await?;
            if report.is_empty() {
                println!("No performance data.");
            } else {
                print_pairs(&report);
            }
        }
    }
    Ok(())
}

async fn run_resource<R: Resource>(app: &App, route: Route, action: CrudAction) -> Result<()> {
    app.enter(route)?;
    let mut screen = ResourceListScreen::<R>::new();
    screen.load(&app.client, &app.cache).await;

    match action {
        CrudAction::List { search } => {
            if let Some(search) = search {
                screen.set_query(search);
            }
            print_list(&screen)?;
        }
        CrudAction::Create { set } => {
            apply_sets(screen.open_create()?, &set)?;
            let created = screen.submit_form(&app.client, &app.cache).await?;
            println!("✅ Created {} {}", R::SINGULAR, created.get("id").cloned().unwrap_or_default());
        }
        CrudAction::Update { id, set } => {
            if let Some(message) = screen.state().error() {
                bail!("{}", message);
            }
            apply_sets(screen.open_edit(id)?, &set)?;
            screen.submit_form(&app.client, &app.cache).await?;
            println!("✅ Updated {} {}", R::SINGULAR, id);
        }
        CrudAction::Delete { id } => match screen.delete(id, &app.confirm, &app.client, &app.cache).await {
            DeleteOutcome::Cancelled => println!("Cancelled."),
            DeleteOutcome::Deleted => println!("🗑️  Deleted {} {}", R::SINGULAR, id),
            DeleteOutcome::Failed(message) => bail!("{}", message),
        },
    }
    Ok(())
}

fn apply_sets<R: Resource>(form: &mut ResourceForm<R>, sets: &[String]) -> Result<()> {
    for pair in sets {
        let (field, value) = pair
            .split_once('=')
            .with_context(|| format!("Expected FIELD=VALUE, got {:?}", pair))?;
        form.set_input(field.trim(), value)?;
    }
    Ok(())
}

async fn run_enrollments(app: &App, action: EnrollmentAction) -> Result<()> {
    match action {
        EnrollmentAction::List { search } => {
            app.enter(Route::AdminEnrollments)?;
            let mut desk = EnrollmentDesk::new();
            desk.load(&app.client, &app.cache).await;
            if let Some(search) = search {
                desk.screen_mut().set_query(search);
            }
            print_list(desk.screen())?;
        }
        EnrollmentAction::Pending => {
            app.enter(Route::AdminEnrollments)?;
            let mut desk = EnrollmentDesk::new();
            desk.load(&app.client, &app.cache).await;
            if let Some(message) = desk.screen().state().error() {
                bail!("{}", message);
            }
            let rows: Vec<Vec<String>> = desk.pending().into_iter().map(|e| desk.screen().row_cells(e)).collect();
            print_table(desk.screen().columns(), &rows);
            println!("\n⏳ {} pending", desk.pending_count());
        }
        EnrollmentAction::Validate { id } => decide(app, id, Decision::Validate).await?,
        EnrollmentAction::Reject { id, reason } => decide(app, id, Decision::Reject { reason }).await?,
        EnrollmentAction::Mine { search } => {
            app.enter(Route::StudentEnrollments)?;
            let mut screen = my_enrollments();
            screen.load(&app.client, &app.cache).await;
            if let Some(search) = search {
                screen.set_query(search);
            }
            print_list(&screen)?;
        }
        EnrollmentAction::Apply { program, year } => {
            app.enter(Route::StudentApplication)?;
            let mut form = ApplicationForm::open(&app.client, &app.cache, &app.year(year)).await?;
            if let Some(program) = program {
                form.select_program(program)?;
            }
            match form.submit(&app.client, &app.cache).await {
                Ok(_) => {
                    if let Some(status) = form.status() {
                        println!("✅ {}", status.text);
                    }
                }
                Err(message) => {
                    if program.is_none() && !form.programs().is_empty() {
                        let rows: Vec<Vec<String>> = form
                            .programs()
                            .iter()
                            .map(|p| vec![p.id.to_string(), p.label.clone()])
                            .collect();
                        print_table(&["ID", "Program"], &rows);
                    }
                    bail!("{}", message);
                }
            }
        }
    }
    Ok(())
}

async fn decide(app: &App, id: RecordId, decision: Decision) -> Result<()> {
    app.enter(Route::AdminEnrollments)?;
    let mut desk = EnrollmentDesk::new();
    desk.load(&app.client, &app.cache).await;

    let verb = decision.verb();
    match desk.decide(id, decision, &app.confirm, &app.client, &app.cache).await {
        DecisionOutcome::Cancelled => println!("Cancelled."),
        DecisionOutcome::Done => println!("✅ {} enrollment {} ({} still pending)", verb, id, desk.pending_count()),
        DecisionOutcome::Failed(message) => bail!("{}", message),
    }
    Ok(())
}

async fn run_grades(app: &App, action: GradeAction) -> Result<()> {
    match action {
        GradeAction::Modules { search } => {
            app.enter(Route::TeacherModules)?;
            let overview = TeacherOverview::load(&app.client, &app.cache).await?;
            let modules = overview.filtered(search.as_deref().unwrap_or(""));
            if modules.is_empty() && !overview.modules.is_empty() {
                println!("No matches.");
                return Ok(());
            }
            let rows: Vec<Vec<String>> = modules
                .into_iter()
                .map(|m| {
                    vec![
                        m.id.map(|id| id.to_string()).unwrap_or_default(),
                        m.code.clone(),
                        m.name.clone(),
                        m.semestre.clone().unwrap_or_default(),
                        m.filiere.as_ref().map(ToString::to_string).unwrap_or_default(),
                        m.student_count.unwrap_or(0).to_string(),
                    ]
                })
                .collect();
            print_table(&["ID", "Code", "Name", "Semester", "Program", "Students"], &rows);
        }
        GradeAction::Show { module, year, search } => {
            app.enter(Route::TeacherGrades(module))?;
            let mut sheet = GradeSheet::new(module, app.year(year));
            sheet.load(&app.client).await;
            if let Some(search) = search {
                sheet.set_query(search);
            }
            print_sheet(&sheet)?;
        }
        GradeAction::Save { module, year, grades } => {
            app.enter(Route::TeacherGrades(module))?;
            let mut sheet = GradeSheet::new(module, app.year(year));
            sheet.load(&app.client).await;
            if let Some(message) = sheet.state().error() {
                bail!("{}", message);
            }
            for edit in &grades {
                let (student, field, value) = parse_grade_edit(edit)?;
                sheet.set_grade(student, field, value)?;
            }
            let saved = sheet.save(&app.client, &app.cache).await;
            print_sheet(&sheet)?;
            if let Some(status) = sheet.status() {
                match status.kind {
                    StatusKind::Success => println!("\n✅ {}", status.text),
                    StatusKind::Error => println!("\n🔥 {}", status.text),
                }
            }
            saved?;
        }
    }
    Ok(())
}

/// `21:exam=14.5` → student 21, exam part, raw "14.5". An empty value clears the grade.
fn parse_grade_edit(edit: &str) -> Result<(RecordId, GradeField, &str)> {
    let (student, rest) = edit
        .split_once(':')
        .with_context(|| format!("Expected STUDENT:FIELD=VALUE, got {:?}", edit))?;
    let (field, value) = rest
        .split_once('=')
        .with_context(|| format!("Expected STUDENT:FIELD=VALUE, got {:?}", edit))?;
    let student = student
        .trim()
        .parse()
        .with_context(|| format!("Invalid student id {:?}", student))?;
    Ok((student, field.parse()?, value))
}

fn print_sheet(sheet: &GradeSheet) -> Result<()> {
    if let Some(message) = sheet.state().error() {
        bail!("{}", message);
    }
    if let Some(module) = sheet.module() {
        println!(
            "📘 {} ({}) - {}\n",
            module.name,
            module.code.as_deref().unwrap_or("-"),
            sheet.academic_year()
        );
    }
    let part = |g: Option<f64>| g.map(format_grade).unwrap_or_default();
    let rows: Vec<Vec<String>> = sheet
        .filtered()
        .into_iter()
        .map(|row| {
            vec![
                row.student_id.to_string(),
                row.student_name.clone(),
                row.cne.clone().unwrap_or_default(),
                part(row.note_controle),
                part(row.note_examen),
                row.average_label(),
                match row.is_passing() {
                    Some(true) => "Passed".to_string(),
                    Some(false) => "Failed".to_string(),
                    None => String::new(),
                },
            ]
        })
        .collect();
    print_table(&["ID", "Student", "CNE", "Control", "Exam", "Average", "Result"], &rows);
    Ok(())
}

async fn show_dashboard(app: &App, role: Role) -> Result<()> {
    match role {
        Role::Etudiant => {
            let overview = StudentOverview::load(&app.client, &app.cache).await?;
            let latest = overview
                .latest_enrollment()
                .map(|e| format!("{} ({})", e.program_label(), e.status.as_str()))
                .unwrap_or_else(|| "None".to_string());
            print_pairs(&[
                ("Enrollment".to_string(), latest),
                ("Average".to_string(), overview.gpa_label()),
                ("Modules passed".to_string(), overview.passed_count().to_string()),
            ]);
        }
        Role::Enseignant => {
            let overview = TeacherOverview::load(&app.client, &app.cache).await?;
            print_pairs(&[
                ("Modules".to_string(), overview.module_count().to_string()),
                ("Students".to_string(), overview.total_students().to_string()),
                ("Programs".to_string(), overview.program_count().to_string()),
            ]);
        }
        Role::Admin | Role::Direction => {
            let stats = DashboardStats::load(&app.client, &app.cache).await?;
            let kpis: Vec<(String, String)> = stats
                .kpi
                .iter()
                .map(|k| {
                    let value = match &k.value {
                        serde_json::Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    let label = match &k.icon {
                        Some(icon) => format!("{} {}", icon, k.label),
                        None => k.label.clone(),
                    };
                    (label, value)
                })
                .collect();
            print_pairs(&kpis);

            let total = stats.department_total();
            if total > 0.0 {
                println!("\nStudents by department");
                let shares: Vec<(String, String)> = stats
                    .department_dist
                    .iter()
                    .map(|s| (s.name.clone(), format!("{} ({:.1}%)", s.value, s.value / total * 100.0)))
                    .collect();
                print_pairs(&shares);
            }
        }
    }
    Ok(())
}
