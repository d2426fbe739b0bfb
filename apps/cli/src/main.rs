use anyhow::{bail, Context};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing::info;
use userext_config::load as load_config;
use userext_runtime::{telemetry, BackendServices};
use userext_users::utils::generate_random_password;
use userext_users::{
    CreateAddressRequest, CreateLocationRequest, CreateUserRequest, Gender, UpdateProfileRequest,
};

const GENERATED_PASSWORD_LENGTH: usize = 16;

#[derive(Parser)]
#[command(name = "userext")]
#[command(about = "Manage user accounts, email verification, phone numbers and addresses")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending database migrations
    Migrate,
    /// Create an inactive user
    CreateUser {
        email: String,
        #[arg(long, conflicts_with = "generate_password")]
        password: Option<String>,
        /// Generate a password and print it once
        #[arg(long)]
        generate_password: bool,
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
    },
    /// Create an active staff superuser
    CreateSuperuser {
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Show users page by page
    ListUsers {
        #[arg(long, default_value_t = 50)]
        limit: u32,
        #[arg(long, default_value_t = 0)]
        offset: u32,
        /// Filter by email or name
        #[arg(long)]
        search: Option<String>,
    },
    /// Show user counts
    Stats,
    /// Update the mandatory profile fields of a user
    UpdateProfile {
        email: String,
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        /// Birth date as YYYY-MM-DD
        #[arg(long)]
        birth_date: String,
        /// m, f or x
        #[arg(long, default_value = "x")]
        gender: String,
        #[arg(long, default_value = "en")]
        language: String,
    },
    /// Issue a verification token and mail it to the user
    SendVerification { email: String },
    /// Verify an email address with its token
    Verify { token: String },
    /// Deactivate a user
    Deactivate { email: String },
    /// Delete a user and everything attached to them
    DeleteUser { email: String },
    /// Attach a phone number to a user
    AddPhone {
        email: String,
        /// Country calling code, e.g. 972
        country_code: String,
        national_number: String,
    },
    /// Mark a phone number as verified
    VerifyPhone { id: i64 },
    /// Make a phone number the default of its owner
    SetDefaultPhone { id: i64 },
    /// Show the phone numbers of a user
    ListPhones { email: String },
    /// Attach a postal address to a user
    AddAddress {
        email: String,
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        #[arg(long)]
        street_name: String,
        #[arg(long)]
        street_number: String,
        #[arg(long)]
        city: String,
        #[arg(long)]
        state: Option<String>,
        /// ISO 3166-1 alpha-2 code
        #[arg(long)]
        country: String,
        #[arg(long)]
        zip_code: u32,
        #[arg(long)]
        timezone: Option<String>,
        #[arg(long)]
        phone_id: i64,
        #[arg(long)]
        billing: bool,
        #[arg(long, default_value = "")]
        notes: String,
    },
    /// Make an address the default of its user
    SetDefaultAddress { id: i64 },
    /// Show the addresses of a user
    ListAddresses { email: String },
    /// Link a shared location to a user
    AddLocation {
        email: String,
        #[arg(long)]
        address: String,
        #[arg(long)]
        city: String,
        #[arg(long)]
        state: Option<String>,
        #[arg(long)]
        country: String,
        #[arg(long)]
        postal_code: u32,
    },
    /// Show the locations linked to a user
    ListLocations { email: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    telemetry::init_tracing().context("failed to initialise tracing")?;

    let config = load_config().context("failed to load configuration")?;
    let services = BackendServices::initialise(&config)
        .await
        .context("failed to initialise account services")?;

    run(cli.command, &services).await
}

async fn run(command: Commands, services: &BackendServices) -> anyhow::Result<()> {
    let accounts = &services.accounts;

    match command {
        Commands::Migrate => {
            info!("database is up to date");
        }
        Commands::CreateUser {
            email,
            password,
            generate_password,
            first_name,
            last_name,
        } => {
            let generated = generate_password.then(|| generate_random_password(GENERATED_PASSWORD_LENGTH));
            let password = password.or_else(|| generated.clone());

            let user = accounts
                .users
                .create_user(CreateUserRequest {
                    email,
                    password,
                    first_name,
                    last_name,
                    ..Default::default()
                })
                .await
                .context("failed to create user")?;
            println!("Created user {}", user.email);
            if let Some(generated) = generated {
                println!("Password: {generated}");
            }
        }
        Commands::CreateSuperuser { email, password } => {
            let user = accounts
                .users
                .create_superuser(CreateUserRequest {
                    email,
                    password: Some(password),
                    ..Default::default()
                })
                .await
                .context("failed to create superuser")?;
            println!("Created superuser {}", user.email);
        }
        Commands::ListUsers {
            limit,
            offset,
            search,
        } => {
            let users = match search {
                Some(query) => accounts.users.search_users(&query, limit).await,
                None => accounts.users.list_users(limit, offset).await,
            }
            .context("failed to fetch users")?;

            if users.is_empty() {
                println!("No users found");
                return Ok(());
            }

            println!(
                "{:<40} {:<30} {:<8} {:<8} {:<25}",
                "Email", "Name", "Active", "Staff", "Created At"
            );
            println!("{}", "-".repeat(115));
            for user in users {
                println!(
                    "{:<40} {:<30} {:<8} {:<8} {:<25}",
                    user.email,
                    user.full_name(),
                    user.is_active,
                    user.is_staff,
                    user.date_created.to_rfc3339()
                );
            }
        }
        Commands::Stats => {
            let stats = accounts
                .users
                .get_user_stats()
                .await
                .context("failed to count users")?;
            println!(
                "total: {}, active: {}, inactive: {}",
                stats.total_users, stats.active_users, stats.inactive_users
            );
        }
        Commands::UpdateProfile {
            email,
            first_name,
            last_name,
            birth_date,
            gender,
            language,
        } => {
            let birth_date = NaiveDate::parse_from_str(&birth_date, "%Y-%m-%d")
                .with_context(|| format!("invalid birth date {birth_date}"))?;
            let Some(gender) = Gender::from_code(&gender) else {
                bail!("unknown gender {gender}, expected m, f or x");
            };

            let user = accounts
                .users
                .update_profile(
                    &email,
                    UpdateProfileRequest {
                        first_name,
                        last_name,
                        gender,
                        birth_date: Some(birth_date),
                        language,
                    },
                )
                .await
                .context("failed to update profile")?;
            println!("Updated profile of {}", user.email);
        }
        Commands::SendVerification { email } => {
            let verification = accounts
                .verifications
                .create_verification_for(&email)
                .await
                .context("failed to create verification")?;
            accounts
                .verifications
                .send_default_verification_email(&verification.email)
                .await
                .context("failed to send verification email")?;
            println!("Sent verification to {}", verification.email);
        }
        Commands::Verify { token } => {
            let verification = accounts
                .verifications
                .verify_str(&token)
                .await
                .context("failed to verify email")?;
            println!("Verified {}", verification.email);
        }
        Commands::Deactivate { email } => {
            accounts
                .users
                .set_active(&email, false)
                .await
                .context("failed to deactivate user")?;
            println!("Deactivated {email}");
        }
        Commands::DeleteUser { email } => {
            accounts
                .users
                .delete_user(&email)
                .await
                .context("failed to delete user")?;
            println!("Deleted {email}");
        }
        Commands::AddPhone {
            email,
            country_code,
            national_number,
        } => {
            let phone = accounts
                .phone_numbers
                .add_from_parts(&email, &country_code, &national_number)
                .await
                .context("failed to add phone number")?;
            println!("Added phone number {} with id {}", phone.number, phone.id);
        }
        Commands::VerifyPhone { id } => {
            let phone = accounts
                .phone_numbers
                .set_verified(id, true)
                .await
                .context("failed to verify phone number")?;
            println!("Verified {} (default: {})", phone.number, phone.is_default);
        }
        Commands::SetDefaultPhone { id } => {
            let phone = accounts
                .phone_numbers
                .set_default(id)
                .await
                .context("failed to set default phone number")?;
            println!("{} is now the default of {}", phone.number, phone.owner_email);
        }
        Commands::ListPhones { email } => {
            let phones = accounts
                .phone_numbers
                .all_of_user(&email)
                .await
                .context("failed to fetch phone numbers")?;

            if phones.is_empty() {
                println!("No phone numbers found for {email}");
                return Ok(());
            }

            println!("{:<6} {:<20} {:<10} {:<10}", "ID", "Number", "Verified", "Default");
            println!("{}", "-".repeat(50));
            for phone in phones {
                println!(
                    "{:<6} {:<20} {:<10} {:<10}",
                    phone.id,
                    phone.number.as_str(),
                    phone.verified,
                    phone.is_default
                );
            }
        }
        Commands::AddAddress {
            email,
            first_name,
            last_name,
            street_name,
            street_number,
            city,
            state,
            country,
            zip_code,
            timezone,
            phone_id,
            billing,
            notes,
        } => {
            let address = accounts
                .addresses
                .add_address(
                    &email,
                    CreateAddressRequest {
                        first_name,
                        last_name,
                        street_name,
                        street_number,
                        city,
                        state,
                        country,
                        zip_code,
                        timezone,
                        phone_number_id: phone_id,
                        default_address: false,
                        default_billing_address: billing,
                        notes,
                    },
                )
                .await
                .context("failed to add address")?;
            println!("Added address {} with id {}", address, address.id);
        }
        Commands::SetDefaultAddress { id } => {
            let address = accounts
                .addresses
                .set_default_address(id)
                .await
                .context("failed to set default address")?;
            println!("{} is now the default of {}", address, address.user_email);
        }
        Commands::ListAddresses { email } => {
            let addresses = accounts
                .addresses
                .addresses_of_user(&email)
                .await
                .context("failed to fetch addresses")?;

            if addresses.is_empty() {
                println!("No addresses found for {email}");
                return Ok(());
            }

            println!("{:<6} {:<9} {:<9} {:<60}", "ID", "Default", "Billing", "Address");
            println!("{}", "-".repeat(86));
            for address in addresses {
                println!(
                    "{:<6} {:<9} {:<9} {:<60}",
                    address.id,
                    address.default_address,
                    address.default_billing_address,
                    address.to_string()
                );
            }
        }
        Commands::AddLocation {
            email,
            address,
            city,
            state,
            country,
            postal_code,
        } => {
            let location = accounts
                .locations
                .get_or_create(CreateLocationRequest {
                    address,
                    city,
                    state,
                    country,
                    postal_code,
                })
                .await
                .context("failed to resolve location")?;
            accounts
                .locations
                .attach_to_user(&email, location.id)
                .await
                .context("failed to link location")?;
            println!("Linked {location} to {email}");
        }
        Commands::ListLocations { email } => {
            let locations = accounts
                .locations
                .locations_of_user(&email)
                .await
                .context("failed to fetch locations")?;

            if locations.is_empty() {
                println!("No locations found for {email}");
            }
            for location in locations {
                println!("{:<6} {}", location.id, location);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_add_phone() {
        let cli = Cli::try_parse_from(["userext", "add-phone", "a@example.com", "972", "0535251234"]).unwrap();
        match cli.command {
            Commands::AddPhone {
                email,
                country_code,
                national_number,
            } => {
                assert_eq!(email, "a@example.com");
                assert_eq!(country_code, "972");
                assert_eq!(national_number, "0535251234");
            }
            _ => panic!("expected add-phone"),
        }
    }

    #[test]
    fn password_flags_conflict() {
        let result = Cli::try_parse_from([
            "userext",
            "create-user",
            "a@example.com",
            "--password",
            "secret",
            "--generate-password",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn add_address_requires_phone() {
        let result = Cli::try_parse_from([
            "userext",
            "add-address",
            "a@example.com",
            "--first-name",
            "Arie",
            "--last-name",
            "Lev",
            "--street-name",
            "Herzl",
            "--street-number",
            "7",
            "--city",
            "Haifa",
            "--country",
            "IL",
            "--zip-code",
            "3303107",
        ]);
        assert!(result.is_err());
    }
}
