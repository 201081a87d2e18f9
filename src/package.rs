// package manager command lines per distro family
//
// The distro string comes from the mirror helper's `detect` and is matched by
// substring, e.g. `centos:7.9.2009`, `opensuse/leap:15.5`, `ubuntu:24.04`.

const YUM: &str = "yum --setopt=repo_gpgcheck=false --setopt=sslverify=false";
const ZYPPER: &str = "zypper --no-gpg-checks";
const APT_GET: &str = "apt-get -o Acquire::AllowInsecureRepositories=true";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Family {
  Yum,
  Zypper,
  Apt,
}

impl Family {

  pub fn of(distro: &str) -> Self {
    if ["centos", "almalinux", "rhel"].iter().any(|name| distro.contains(name)) {
      Family::Yum
    } else if distro.contains("opensuse") {
      Family::Zypper
    } else {
      Family::Apt
    }
  }
}

pub fn package_tool(distro: &str) -> String {
  match Family::of(distro) {
    Family::Yum => YUM.to_owned(),
    Family::Zypper => format!("{} --no-refresh", ZYPPER),
    Family::Apt => APT_GET.to_owned(),
  }
}

pub fn package_refresh(distro: &str) -> String {
  match Family::of(distro) {
    Family::Yum => format!("{} check-update", YUM),
    Family::Zypper => format!("{} refresh", ZYPPER),
    Family::Apt => format!("{} update", APT_GET),
  }
}

pub fn package_search(distro: &str) -> String {
  match Family::of(distro) {
    Family::Yum => format!("{} search", YUM),
    Family::Zypper => "zypper --no-refresh search".to_owned(),
    Family::Apt => "apt-cache search".to_owned(),
  }
}
